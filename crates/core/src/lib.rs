//! Core types and logic for the Steam library dashboard
//!
//! This crate contains:
//! - Data models decoded from the dashboard backend
//! - Error types
//! - Collaborator traits (`DataSource`, `Renderer`)
//! - The pure page query (filter, sort, paginate)
//! - `LibraryView`, which owns view state and drives enrichment

pub mod models;
pub mod error;
pub mod query;
pub mod source;
pub mod render;
pub mod sheet;
pub mod library;

pub use models::*;
pub use error::*;
pub use query::*;
pub use source::*;
pub use render::*;
pub use sheet::*;
pub use library::*;

#[cfg(test)]
mod testing;
