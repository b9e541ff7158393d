//! Error types for the dashboard

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("No Steam account configured")]
    NotConfigured,
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        DashboardError::InvalidData(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
