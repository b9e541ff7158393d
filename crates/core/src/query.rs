//! Page query: search, filter, sort and paginate the library
//!
//! Everything in here is a pure function of `ViewState`. No I/O.

use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{AchievementSummary, AppId, CompletionSummary, Game};

pub const DEFAULT_PAGE_SIZE: usize = 40;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    #[default]
    All,
    Completed,
    InProgress,
    NoAchievements,
    /// Only titles with a known last-played time, newest first
    RecentlyPlayed,
}

impl FilterMode {
    pub fn matches(&self, game: &Game, summary: Option<&AchievementSummary>) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Completed => summary.map(|s| s.is_completed()).unwrap_or(false),
            FilterMode::InProgress => summary.map(|s| s.is_in_progress()).unwrap_or(false),
            FilterMode::NoAchievements => summary.map(|s| !s.has_achievements()).unwrap_or(true),
            FilterMode::RecentlyPlayed => game.last_played.is_some(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Completed => "completed",
            FilterMode::InProgress => "in-progress",
            FilterMode::NoAchievements => "no-achievements",
            FilterMode::RecentlyPlayed => "recently-played",
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "completed" => Ok(FilterMode::Completed),
            "in-progress" | "progress" => Ok(FilterMode::InProgress),
            "no-achievements" | "none" => Ok(FilterMode::NoAchievements),
            "recently-played" | "recent" => Ok(FilterMode::RecentlyPlayed),
            other => Err(format!("unknown filter: {}", other)),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Playtime, most played first
    #[default]
    Played,
    Name,
    /// Completion percent, highest first
    Completion,
}

impl SortMode {
    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Played => "played",
            SortMode::Name => "name",
            SortMode::Completion => "completion",
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "played" | "playtime" => Ok(SortMode::Played),
            "name" => Ok(SortMode::Name),
            "completion" => Ok(SortMode::Completion),
            other => Err(format!("unknown sort: {}", other)),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The user-controlled part of the view state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filter: FilterMode,
    pub sort: SortMode,
    pub search: String,
    pub page_size: usize,
    pub page: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: FilterMode::All,
            sort: SortMode::Played,
            search: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            page: 0,
        }
    }
}

/// Everything the library view knows. Owned by `LibraryView`.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Full library, in the order the backend returned it
    pub all_games: Vec<Game>,
    pub search: String,
    pub filter: FilterMode,
    pub sort: SortMode,
    pub page_size: usize,
    pub current_page: usize,
    /// Grows monotonically for the session
    pub achievement_cache: HashMap<AppId, AchievementSummary>,
    /// Most recent enrichment batch
    pub epoch: u64,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            all_games: Vec::new(),
            search: String::new(),
            filter: FilterMode::All,
            sort: SortMode::Played,
            page_size: page_size.max(1),
            current_page: 0,
            achievement_cache: HashMap::new(),
            epoch: 0,
        }
    }

    pub fn query(&self) -> Query {
        Query {
            filter: self.filter,
            sort: self.sort,
            search: self.search.clone(),
            page_size: self.page_size,
            page: self.current_page,
        }
    }

    pub fn percent(&self, appid: &AppId) -> u8 {
        completion_percent(&self.achievement_cache, appid)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// Result of `compute_visible_page`
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub items: Vec<Game>,
    pub page_index: usize,
    pub page_count: usize,
    pub filtered_count: usize,
    /// Filtered titles that the completion sort ranked without data
    pub missing_summaries: Vec<AppId>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Rounded completion percent for a title, 0 when unknown or without achievements
pub fn completion_percent(cache: &HashMap<AppId, AchievementSummary>, appid: &AppId) -> u8 {
    cache.get(appid).map(|s| s.percent()).unwrap_or(0)
}

/// Sum of playtime in whole hours, rounded to nearest
pub fn total_playtime_hours(games: &[Game]) -> u64 {
    let minutes: u64 = games.iter().map(|g| g.playtime_minutes).sum();
    (minutes as f64 / 60.0).round() as u64
}

/// Per-title average of unlocked/total over titles that have achievements.
///
/// Returns `None` when no title has achievements.
pub fn aggregate_completion<'a>(summaries: impl IntoIterator<Item = &'a AchievementSummary>) -> Option<CompletionSummary> {
    let (sum, counted) = summaries
        .into_iter()
        .filter_map(|s| s.ratio())
        .fold((0.0_f64, 0usize), |(sum, n), r| (sum + r, n + 1));

    if counted == 0 {
        return None;
    }
    Some(CompletionSummary {
        percent: (100.0 * sum / counted as f64).round() as u8,
        counted,
    })
}

/// Primary collation key: decomposed, accents stripped, lowercase
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Accent- and case-insensitive first, then case-insensitive, then raw
fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Sort in place. All sorts are stable.
pub fn sort_games(games: &mut [&Game], sort: SortMode, cache: &HashMap<AppId, AchievementSummary>) {
    match sort {
        SortMode::Played => games.sort_by_key(|g| Reverse(g.playtime_minutes)),
        SortMode::Name => games.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortMode::Completion => games.sort_by_key(|g| Reverse(completion_percent(cache, &g.appid))),
    }
}

/// The whole filtered and sorted library, before pagination
pub fn ordered_games(state: &ViewState) -> Vec<&Game> {
    let needle = state.search.to_lowercase();

    let mut games: Vec<&Game> = state
        .all_games
        .iter()
        .filter(|g| needle.is_empty() || g.name.to_lowercase().contains(&needle))
        .filter(|g| state.filter.matches(g, state.achievement_cache.get(&g.appid)))
        .collect();

    if state.filter == FilterMode::RecentlyPlayed {
        games.sort_by_key(|g| Reverse(g.last_played));
    } else {
        sort_games(&mut games, state.sort, &state.achievement_cache);
    }
    games
}

pub fn page_count(filtered_count: usize, page_size: usize) -> usize {
    filtered_count.div_ceil(page_size.max(1)).max(1)
}

/// Compute the page the user currently sees. `page_index` is the clamped page.
pub fn compute_visible_page(state: &ViewState) -> PageView {
    let ordered = ordered_games(state);
    let page_size = state.page_size.max(1);
    let filtered_count = ordered.len();
    let page_count = page_count(filtered_count, page_size);
    let page_index = state.current_page.min(page_count - 1);

    let missing_summaries = if state.sort == SortMode::Completion && state.filter != FilterMode::RecentlyPlayed {
        ordered
            .iter()
            .filter(|g| !state.achievement_cache.contains_key(&g.appid))
            .map(|g| g.appid.clone())
            .collect()
    } else {
        Vec::new()
    };

    let items = ordered
        .into_iter()
        .skip(page_index * page_size)
        .take(page_size)
        .cloned()
        .collect();

    PageView {
        items,
        page_index,
        page_count,
        filtered_count,
        missing_summaries,
    }
}
