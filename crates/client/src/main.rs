//! steamdash - terminal client for the Steam library dashboard
//!
//! Talks to the dashboard backend, renders one library page at a time and
//! fills in achievement and DLC badges as they arrive.

mod backend_api;
mod cli;
mod config;
mod ui;

use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steamdash_core::{AppId, DashboardError, DataSource, LibraryView, Query, Result};

use crate::backend_api::BackendClient;
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::ui::TerminalRenderer;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steamdash=info,steamdash_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    config.apply_env();
    if let Some(language) = cli.language {
        config.language = language;
    }

    match run(cli.command.unwrap_or_default(), &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(DashboardError::NotConfigured) => {
            eprintln!("No Steam ID configured. Run `steamdash login <steam_id>` first.");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn io_error(e: io::Error) -> DashboardError {
    DashboardError::InvalidData(format!("Failed to write output: {}", e))
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let backend = Arc::new(BackendClient::from_config(config)?);
    let mut out = io::stdout().lock();

    match &command {
        Command::Login { steam_id } => {
            backend.save_steam_id(steam_id).await?;
            tracing::info!("Saved Steam ID {}", steam_id.trim());
            return Ok(());
        }
        Command::Logout => {
            backend.logout().await?;
            tracing::info!("Logged out");
            return Ok(());
        }
        _ => {}
    }

    if !backend.account().await?.is_configured() {
        return Err(DashboardError::NotConfigured);
    }

    match command {
        Command::Library {
            search,
            filter,
            sort,
            page,
            page_size,
        } => {
            let defaults = config.query();
            let query = Query {
                filter: filter.unwrap_or(defaults.filter),
                sort: sort.unwrap_or(defaults.sort),
                search: search.unwrap_or_default(),
                page_size: page_size.unwrap_or(defaults.page_size).max(1),
                page: 0,
            };

            let mut view =
                LibraryView::new(backend, TerminalRenderer::new()).with_query(query).with_language(config.language);
            match view.load_library().await {
                Ok(count) => tracing::debug!(count, "Library loaded"),
                Err(e) => {
                    view.renderer().write_to(&mut out).map_err(io_error)?;
                    return Err(e);
                }
            }
            view.go_to_page(page.saturating_sub(1));
            view.settle().await;
            view.renderer().write_to(&mut out).map_err(io_error)?;
        }
        Command::Summary => {
            let games = backend.games_summary().await?;
            let mut view = LibraryView::new(backend, TerminalRenderer::new());
            view.set_games(games);
            let state = view.completion_summary().await;
            writeln!(out, "Total playtime: {}h", view.total_playtime_hours()).map_err(io_error)?;
            ui::write_completion(&state, &mut out).map_err(io_error)?;
        }
        Command::Achievements { appid } => {
            let games = backend.games_summary().await?;
            let mut view = LibraryView::new(backend, TerminalRenderer::new()).with_language(config.language);
            view.set_games(games);
            let sheet = view.open_achievements(&AppId::from(appid)).await?;
            ui::write_sheet(&sheet, &mut out).map_err(io_error)?;
        }
        Command::Profile => {
            let profile = backend.profile().await?;
            ui::write_profile(&profile, &mut out).map_err(io_error)?;
        }
        Command::Login { .. } | Command::Logout => {}
    }

    out.flush().map_err(io_error)
}
