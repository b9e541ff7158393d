//! Data models decoded from the dashboard backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Library
// ============================================================================

/// Opaque title identifier. The backend sends it either as a string or as a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AppId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => AppId(s),
            Raw::Number(n) => AppId(n.to_string()),
        })
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        AppId(s.to_string())
    }
}

impl From<String> for AppId {
    fn from(s: String) -> Self {
        AppId(s)
    }
}

impl From<u64> for AppId {
    fn from(n: u64) -> Self {
        AppId(n.to_string())
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An owned title as returned by `games_summary`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub appid: AppId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "playtime", default)]
    pub playtime_minutes: u64,
    #[serde(
        default,
        deserialize_with = "deserialize_last_played",
        serialize_with = "chrono::serde::ts_seconds_option::serialize"
    )]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(rename = "img", default)]
    pub image_url: String,
}

impl Game {
    pub fn new(appid: impl Into<AppId>, name: impl Into<String>, playtime_minutes: u64) -> Self {
        Self {
            appid: appid.into(),
            name: name.into(),
            playtime_minutes,
            last_played: None,
            image_url: String::new(),
        }
    }

    pub fn with_last_played(mut self, unix_secs: i64) -> Self {
        self.last_played = DateTime::from_timestamp(unix_secs, 0);
        self
    }

    pub fn playtime_hours(&self) -> f64 {
        self.playtime_minutes as f64 / 60.0
    }
}

/// Steam reports "never played" as 0, which we treat the same as a missing value.
fn deserialize_last_played<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = Option::<i64>::deserialize(deserializer)?;
    Ok(secs.filter(|s| *s > 0).and_then(|s| DateTime::from_timestamp(s, 0)))
}

/// Body of `GET steam/games_summary`
#[derive(Debug, Clone, Deserialize)]
pub struct GamesSummaryResponse {
    #[serde(default)]
    pub games: Vec<Game>,
    #[serde(default)]
    pub total_count: Option<usize>,
}

// ============================================================================
// Achievements
// ============================================================================

/// Unlocked/total counts for one title. `total == 0` means the title has no achievements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSummary")]
pub struct AchievementSummary {
    #[serde(rename = "u")]
    pub unlocked: u32,
    #[serde(rename = "t")]
    pub total: u32,
}

#[derive(Deserialize)]
struct RawSummary {
    #[serde(default)]
    u: u32,
    #[serde(default)]
    t: u32,
}

impl From<RawSummary> for AchievementSummary {
    fn from(raw: RawSummary) -> Self {
        AchievementSummary::new(raw.u, raw.t)
    }
}

impl AchievementSummary {
    /// Clamps `unlocked` into `[0, total]`.
    pub fn new(unlocked: u32, total: u32) -> Self {
        Self { unlocked: unlocked.min(total), total }
    }

    pub fn has_achievements(&self) -> bool {
        self.total > 0
    }

    pub fn is_completed(&self) -> bool {
        self.total > 0 && self.unlocked == self.total
    }

    pub fn is_in_progress(&self) -> bool {
        self.total > 0 && self.unlocked > 0 && self.unlocked < self.total
    }

    pub fn ratio(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.unlocked.min(self.total) as f64 / self.total as f64)
        }
    }

    /// Rounded completion percent in `[0, 100]`; 0 for titles without achievements.
    pub fn percent(&self) -> u8 {
        self.ratio().map(|r| (r * 100.0).round() as u8).unwrap_or(0)
    }
}

/// Achievement definition from `GET steam/schema/{appid}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaAchievement {
    /// Technical key; empty when the backend sends none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "displayName", default, deserialize_with = "null_as_empty")]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub icongray: String,
}

impl SchemaAchievement {
    /// Key used to join player state and rarity: the technical name, or the
    /// display name when the schema has no technical name
    pub fn key(&self) -> &str {
        if self.name.is_empty() {
            &self.display_name
        } else {
            &self.name
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaResponse {
    #[serde(default)]
    pub achievements: Vec<SchemaAchievement>,
}

/// The player's state for one achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerAchievement {
    #[serde(default)]
    pub achieved: u8,
    #[serde(default)]
    pub unlocktime: i64,
}

impl PlayerAchievement {
    pub fn is_unlocked(&self) -> bool {
        self.achieved == 1
    }

    pub fn unlocked_at(&self) -> Option<DateTime<Utc>> {
        if self.is_unlocked() && self.unlocktime > 0 {
            DateTime::from_timestamp(self.unlocktime, 0)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerAchievementsResponse {
    #[serde(default)]
    pub achievements: HashMap<String, PlayerAchievement>,
}

/// Percent of all players that unlocked each achievement of one title
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalRarity {
    percentages: HashMap<String, f64>,
}

impl GlobalRarity {
    pub fn new(percentages: HashMap<String, f64>) -> Self {
        Self { percentages }
    }

    /// Decode the `percentages` field of `GET steam/global_ach/{appid}`.
    ///
    /// Accepts a key → number map (numbers may arrive as strings) or Steam's
    /// raw `[{name, percent}]` list.
    pub fn from_response(body: &serde_json::Value) -> Self {
        let mut percentages = HashMap::new();
        let field = &body["percentages"];

        if let Some(map) = field.as_object() {
            for (key, value) in map {
                if let Some(pct) = json_percent(value) {
                    percentages.insert(key.clone(), pct);
                }
            }
        } else if let Some(list) = field.as_array() {
            for entry in list {
                if let (Some(name), Some(pct)) = (entry["name"].as_str(), json_percent(&entry["percent"])) {
                    percentages.insert(name.to_string(), pct);
                }
            }
        }

        Self { percentages }
    }

    pub fn percent(&self, key: &str) -> Option<f64> {
        self.percentages.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.percentages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.percentages.is_empty()
    }
}

fn json_percent(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .map(|pct| pct.clamp(0.0, 100.0))
}

// ============================================================================
// DLC
// ============================================================================

/// Owned/total DLC counts for one title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlcSummary {
    pub owned: u32,
    pub total: u32,
}

/// Body of `GET steam/game_details/{appid}`. Fields are kept raw because the
/// backend is not consistent about sending numbers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameDetails {
    #[serde(default)]
    pub owned_dlc: Option<serde_json::Value>,
    #[serde(default)]
    pub total_dlc: Option<serde_json::Value>,
}

impl GameDetails {
    pub fn new(owned: u32, total: u32) -> Self {
        Self {
            owned_dlc: Some(owned.into()),
            total_dlc: Some(total.into()),
        }
    }

    pub fn dlc_badge(&self) -> DlcBadge {
        let owned = self.owned_dlc.as_ref().and_then(|v| v.as_u64());
        let total = self.total_dlc.as_ref().and_then(|v| v.as_u64());
        match (owned, total) {
            (Some(owned), Some(total)) => match (u32::try_from(owned), u32::try_from(total)) {
                (Ok(owned), Ok(total)) => DlcBadge::Owned(DlcSummary { owned, total }),
                _ => DlcBadge::Unavailable,
            },
            (_, Some(0)) => DlcBadge::Owned(DlcSummary { owned: 0, total: 0 }),
            _ => DlcBadge::Unavailable,
        }
    }
}

// ============================================================================
// Card badges and summary states
// ============================================================================

/// Achievement state shown on a library card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementBadge {
    /// Not fetched yet
    Loading,
    /// The fetch failed; progress is unknown
    Unknown,
    NoAchievements,
    Progress {
        unlocked: u32,
        total: u32,
        percent: u8,
        completed: bool,
    },
}

impl AchievementBadge {
    pub fn from_summary(summary: &AchievementSummary) -> Self {
        if summary.has_achievements() {
            AchievementBadge::Progress {
                unlocked: summary.unlocked,
                total: summary.total,
                percent: summary.percent(),
                completed: summary.is_completed(),
            }
        } else {
            AchievementBadge::NoAchievements
        }
    }

    pub fn from_cached(summary: Option<&AchievementSummary>) -> Self {
        summary.map(Self::from_summary).unwrap_or(AchievementBadge::Loading)
    }
}

impl fmt::Display for AchievementBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AchievementBadge::Loading => write!(f, "…"),
            AchievementBadge::Unknown => write!(f, "?"),
            AchievementBadge::NoAchievements => write!(f, "No achievements"),
            AchievementBadge::Progress { unlocked, total, completed, .. } => {
                write!(f, "{}/{}", unlocked, total)?;
                if *completed {
                    write!(f, " 🏆")?;
                }
                Ok(())
            }
        }
    }
}

/// DLC state shown on a library card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlcBadge {
    Loading,
    Owned(DlcSummary),
    /// Rendered as "—"
    Unavailable,
}

impl fmt::Display for DlcBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DlcBadge::Loading => write!(f, "📦 …"),
            DlcBadge::Owned(dlc) => write!(f, "📦 {}/{}", dlc.owned, dlc.total),
            DlcBadge::Unavailable => write!(f, "📦 —"),
        }
    }
}

/// Average completion over the titles that have achievements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionSummary {
    pub percent: u8,
    pub counted: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionState {
    Loading,
    Ready(CompletionSummary),
    /// No title in the library has achievements
    NotApplicable,
    Failed(String),
}

impl fmt::Display for CompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionState::Loading => write!(f, "Calculating..."),
            CompletionState::Ready(s) => write!(f, "{}% ({} games analyzed)", s.percent, s.counted),
            CompletionState::NotApplicable => write!(f, "N/A"),
            CompletionState::Failed(_) => write!(f, "Calculation failed"),
        }
    }
}

// ============================================================================
// Account
// ============================================================================

/// Subset of `GET data` used to gate the library behind a configured account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub steam_id: String,
}

impl Account {
    pub fn is_configured(&self) -> bool {
        !self.steam_id.trim().is_empty()
    }
}

/// Player profile from `GET steam/profile`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "steamid")]
    pub steam_id: String,
    #[serde(rename = "persona_name", default)]
    pub display_name: String,
    #[serde(rename = "avatar", default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "profileurl", default)]
    pub profile_url: Option<String>,
}

// ============================================================================
// Language
// ============================================================================

/// Languages the achievement schema can be localized in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    It,
    Fr,
    De,
    Es,
    Pt,
    Ru,
    Zh,
    Jp,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::En,
        Language::It,
        Language::Fr,
        Language::De,
        Language::Es,
        Language::Pt,
        Language::Ru,
        Language::Zh,
        Language::Jp,
    ];

    /// Short code sent to the backend in the `l` query parameter
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::It => "it",
            Language::Fr => "fr",
            Language::De => "de",
            Language::Es => "es",
            Language::Pt => "pt",
            Language::Ru => "ru",
            Language::Zh => "zh",
            Language::Jp => "jp",
        }
    }

    /// Language name as the Steam Web API expects it
    pub fn steam_name(&self) -> &'static str {
        match self {
            Language::En => "english",
            Language::It => "italian",
            Language::Fr => "french",
            Language::De => "german",
            Language::Es => "spanish",
            Language::Pt => "portuguese",
            Language::Ru => "russian",
            Language::Zh => "schinese",
            Language::Jp => "japanese",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.code() == s || l.steam_name() == s)
            .ok_or_else(|| format!("unknown language: {}", s))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
