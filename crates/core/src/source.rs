//! Data source collaborator
//!
//! Everything the library view needs from the backend. Implementations must
//! be shareable across spawned tasks.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{
    AchievementSummary, AppId, Game, GameDetails, GlobalRarity, Language, PlayerAchievement, SchemaAchievement,
};

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Full list of owned titles, in backend order
    async fn games_summary(&self) -> Result<Vec<Game>>;

    /// Achievement counts for many titles in one request.
    ///
    /// Titles missing from the returned map are unknown or have no schema.
    async fn achievements_bulk(&self, appids: &[AppId]) -> Result<HashMap<AppId, AchievementSummary>>;

    async fn game_details(&self, appid: &AppId) -> Result<GameDetails>;

    async fn schema(&self, appid: &AppId, language: Language) -> Result<Vec<SchemaAchievement>>;

    /// Unlock state keyed by achievement name
    async fn player_achievements(&self, appid: &AppId) -> Result<HashMap<String, PlayerAchievement>>;

    async fn global_rarity(&self, appid: &AppId) -> Result<GlobalRarity>;
}
