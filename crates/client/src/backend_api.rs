//! Calls to the dashboard backend
//!
//! The backend wraps the Steam Web API behind a small JSON API. Shapes are
//! decoded leniently: entries that fail to decode are skipped rather than
//! failing the whole response.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use steamdash_core::{
    AchievementSummary, Account, AppId, DashboardError, DataSource, Game, GameDetails, GamesSummaryResponse,
    GlobalRarity, Language, PlayerAchievement, Result, SchemaAchievement, UserProfile,
};

use crate::config::Config;

const API_DATA: &str = "data";
const API_CONFIG: &str = "config";
const API_PROFILE: &str = "steam/profile";
const API_LOGOUT: &str = "steam/logout";
const API_GAMES_SUMMARY: &str = "steam/games_summary";
const API_ACHIEVEMENTS_BULK: &str = "steam/achievements_bulk";
const API_GAME_DETAILS: &str = "steam/game_details";
const API_SCHEMA: &str = "steam/schema";
const API_PLAYER_ACHIEVEMENTS: &str = "steam/player_achievements";
const API_GLOBAL_ACHIEVEMENTS: &str = "steam/global_ach";

pub struct BackendClient {
    client: reqwest::Client,
    api_base: String,
}

fn network_error(e: reqwest::Error) -> DashboardError {
    if e.is_decode() {
        DashboardError::InvalidData(e.to_string())
    } else {
        DashboardError::Network(e.to_string())
    }
}

impl BackendClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        if !config.is_valid() {
            return Err(DashboardError::Config(format!("Invalid api_base: {}", config.api_base)));
        }
        Self::new(&config.api_base, config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn item_url(&self, path: &str, appid: &AppId) -> String {
        format!("{}/{}/{}", self.api_base, path, urlencoding::encode(appid.as_str()))
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // The backend reports a missing account as `{"error": "Missing SteamID ..."}`
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or(text);
            if message.contains("SteamID") {
                return Err(DashboardError::NotConfigured);
            }
            return Err(DashboardError::Http {
                status: status.as_u16(),
                message,
            });
        }
        response.json::<Value>().await.map_err(network_error)
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(network_error)?;
        Self::read_json(response).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await.map_err(network_error)?;
        Self::read_json(response).await
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// Stored account; an empty `steam_id` means the user must log in first
    pub async fn account(&self) -> Result<Account> {
        let body = self.get_json(&self.url(API_DATA)).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn save_steam_id(&self, steam_id: &str) -> Result<()> {
        let steam_id = steam_id.trim();
        if steam_id.is_empty() {
            return Err(DashboardError::Config("Steam ID must not be empty".to_string()));
        }
        self.post_json(&self.url(API_CONFIG), &json!({ "steam_id": steam_id })).await?;
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.post_json(&self.url(API_LOGOUT), &json!({})).await?;
        Ok(())
    }

    pub async fn profile(&self) -> Result<UserProfile> {
        let body = self.get_json(&self.url(API_PROFILE)).await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Accepts both the backend's `{key: {achieved}}` map and Steam's raw
/// `[{apiname, achieved, unlocktime}]` list.
fn decode_player_achievements(body: &Value) -> HashMap<String, PlayerAchievement> {
    let field = &body["achievements"];
    if let Some(map) = field.as_object() {
        map.iter()
            .filter_map(|(key, v)| serde_json::from_value(v.clone()).ok().map(|a| (key.clone(), a)))
            .collect()
    } else if let Some(list) = field.as_array() {
        list.iter()
            .filter_map(|a| {
                let key = a["apiname"].as_str().or_else(|| a["name"].as_str())?;
                let state: PlayerAchievement = serde_json::from_value(a.clone()).ok()?;
                Some((key.to_string(), state))
            })
            .collect()
    } else {
        HashMap::new()
    }
}

/// Accepts the backend's normalized list or Steam's raw `GetSchemaForGame` body.
fn decode_schema(body: &Value) -> Vec<SchemaAchievement> {
    let list = body["achievements"]
        .as_array()
        .or_else(|| body["game"]["availableGameStats"]["achievements"].as_array());
    list.map(|arr| {
        arr.iter()
            .filter_map(|a| serde_json::from_value(a.clone()).ok())
            .collect()
    })
    .unwrap_or_default()
}

#[async_trait]
impl DataSource for BackendClient {
    async fn games_summary(&self) -> Result<Vec<Game>> {
        let body = self.get_json(&self.url(API_GAMES_SUMMARY)).await?;
        let summary: GamesSummaryResponse = serde_json::from_value(body)?;
        tracing::debug!(games = summary.games.len(), "Fetched games summary");
        Ok(summary.games)
    }

    async fn achievements_bulk(&self, appids: &[AppId]) -> Result<HashMap<AppId, AchievementSummary>> {
        if appids.is_empty() {
            return Ok(HashMap::new());
        }
        let body = self
            .post_json(&self.url(API_ACHIEVEMENTS_BULK), &json!({ "appids": appids }))
            .await?;

        let summaries = body
            .as_object()
            .map(|map| {
                map.iter()
                    .filter_map(|(appid, v)| {
                        serde_json::from_value::<AchievementSummary>(v.clone())
                            .ok()
                            .map(|s| (AppId::from(appid.as_str()), s))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(summaries)
    }

    async fn game_details(&self, appid: &AppId) -> Result<GameDetails> {
        let body = self.get_json(&self.item_url(API_GAME_DETAILS, appid)).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn schema(&self, appid: &AppId, language: Language) -> Result<Vec<SchemaAchievement>> {
        let url = format!("{}?l={}", self.item_url(API_SCHEMA, appid), language.code());
        let body = self.get_json(&url).await?;
        Ok(decode_schema(&body))
    }

    async fn player_achievements(&self, appid: &AppId) -> Result<HashMap<String, PlayerAchievement>> {
        let body = self.get_json(&self.item_url(API_PLAYER_ACHIEVEMENTS, appid)).await?;
        Ok(decode_player_achievements(&body))
    }

    async fn global_rarity(&self, appid: &AppId) -> Result<GlobalRarity> {
        let body = self.get_json(&self.item_url(API_GLOBAL_ACHIEVEMENTS, appid)).await?;
        Ok(GlobalRarity::from_response(&body))
    }
}
