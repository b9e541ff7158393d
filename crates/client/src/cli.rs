use clap::{Parser, Subcommand};
use std::path::PathBuf;

use steamdash_core::{FilterMode, Language, SortMode};

#[derive(Parser, Debug)]
#[command(
    name = "steamdash",
    version = env!("CARGO_PKG_VERSION"),
    about = "Browse a Steam library with achievement and DLC progress",
    long_about = None,
)]
pub struct Cli {
    /// Path to config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Language for achievement names (en, it, fr, de, es, pt, ru, zh, jp)
    #[arg(long = "lang", global = true)]
    pub language: Option<Language>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show one page of the library (default)
    Library {
        #[arg(long, short)]
        search: Option<String>,

        /// all, completed, in-progress, no-achievements, recently-played
        #[arg(long, short)]
        filter: Option<FilterMode>,

        /// played, name, completion
        #[arg(long)]
        sort: Option<SortMode>,

        /// One-based page number
        #[arg(long, short, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Average completion over the whole library
    Summary,
    /// Achievement sheet for one game
    Achievements { appid: String },
    /// Store the Steam ID used by the backend
    Login { steam_id: String },
    /// Forget the stored Steam ID
    Logout,
    Profile,
}

impl Default for Command {
    fn default() -> Self {
        Command::Library {
            search: None,
            filter: None,
            sort: None,
            page: 1,
            page_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_library_options() {
        let cli = Cli::try_parse_from([
            "steamdash", "--lang", "de", "library", "--filter", "in-progress", "--sort", "completion", "-p", "3",
        ])
        .unwrap();
        assert_eq!(cli.language, Some(Language::De));
        assert_eq!(
            cli.command,
            Some(Command::Library {
                search: None,
                filter: Some(FilterMode::InProgress),
                sort: Some(SortMode::Completion),
                page: 3,
                page_size: None,
            })
        );
    }

    #[test]
    fn no_subcommand_defaults_to_library() {
        let cli = Cli::try_parse_from(["steamdash"]).unwrap();
        assert_eq!(cli.command.unwrap_or_default(), Command::default());
        assert!(Cli::try_parse_from(["steamdash", "library", "--sort", "bogus"]).is_err());
    }
}
