//! In-memory collaborators for tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

use crate::error::{DashboardError, Result};
use crate::models::{
    AchievementBadge, AchievementSummary, AppId, CompletionState, DlcBadge, Game, GameDetails, GlobalRarity, Language,
    PlayerAchievement, SchemaAchievement,
};
use crate::render::{CardHandle, RenderedPage, Renderer};
use crate::source::DataSource;

#[derive(Default)]
pub(crate) struct FakeSource {
    pub games: Vec<Game>,
    pub summaries: HashMap<AppId, AchievementSummary>,
    pub dlc: HashMap<AppId, GameDetails>,
    pub failing_dlc: HashSet<AppId>,
    pub panicking_dlc: HashSet<AppId>,
    pub schema: HashMap<AppId, Vec<SchemaAchievement>>,
    pub player: HashMap<AppId, HashMap<String, PlayerAchievement>>,
    pub rarity: HashMap<AppId, GlobalRarity>,
    pub fail_games: bool,
    pub fail_bulk: bool,
    pub fail_schema: bool,
    /// A bulk request containing this appid waits until the sender fires
    pub gate: Mutex<Option<(AppId, oneshot::Receiver<()>)>>,
    pub bulk_calls: Mutex<Vec<Vec<AppId>>>,
    pub languages: Mutex<Vec<Language>>,
    pub rarity_calls: AtomicUsize,
}

fn offline() -> DashboardError {
    DashboardError::Network("connection refused".to_string())
}

#[async_trait]
impl DataSource for FakeSource {
    async fn games_summary(&self) -> Result<Vec<Game>> {
        if self.fail_games {
            return Err(offline());
        }
        Ok(self.games.clone())
    }

    async fn achievements_bulk(&self, appids: &[AppId]) -> Result<HashMap<AppId, AchievementSummary>> {
        self.bulk_calls.lock().unwrap().push(appids.to_vec());
        let gate = {
            let mut gate = self.gate.lock().unwrap();
            let gated = gate.as_ref().map(|(id, _)| appids.contains(id)).unwrap_or(false);
            if gated {
                gate.take().map(|(_, rx)| rx)
            } else {
                None
            }
        };
        if let Some(rx) = gate {
            let _ = rx.await;
        }

        if self.fail_bulk {
            return Err(offline());
        }
        Ok(appids
            .iter()
            .filter_map(|id| self.summaries.get(id).map(|s| (id.clone(), *s)))
            .collect())
    }

    async fn game_details(&self, appid: &AppId) -> Result<GameDetails> {
        if self.panicking_dlc.contains(appid) {
            panic!("details handler crashed for {}", appid);
        }
        if self.failing_dlc.contains(appid) {
            return Err(offline());
        }
        Ok(self.dlc.get(appid).cloned().unwrap_or_else(|| GameDetails::new(1, 2)))
    }

    async fn schema(&self, appid: &AppId, language: Language) -> Result<Vec<SchemaAchievement>> {
        self.languages.lock().unwrap().push(language);
        if self.fail_schema {
            return Err(offline());
        }
        Ok(self.schema.get(appid).cloned().unwrap_or_default())
    }

    async fn player_achievements(&self, appid: &AppId) -> Result<HashMap<String, PlayerAchievement>> {
        Ok(self.player.get(appid).cloned().unwrap_or_default())
    }

    async fn global_rarity(&self, appid: &AppId) -> Result<GlobalRarity> {
        self.rarity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rarity.get(appid).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub(crate) struct RecordingRenderer {
    pub pages: Vec<RenderedPage>,
    pub achievement_updates: Vec<(CardHandle, AchievementBadge)>,
    pub dlc_updates: Vec<(CardHandle, DlcBadge)>,
    pub failures: Vec<DashboardError>,
    pub loading: usize,
    pub playtime: Option<u64>,
    pub completion: Vec<CompletionState>,
}

impl RecordingRenderer {
    /// Latest achievement badge sent for a title
    pub fn achievement_badge(&self, appid: &str) -> Option<AchievementBadge> {
        self.achievement_updates
            .iter()
            .rev()
            .find(|(card, _)| card.appid.as_str() == appid)
            .map(|(_, badge)| *badge)
    }

    /// Latest DLC badge sent for a title
    pub fn dlc_badge(&self, appid: &str) -> Option<DlcBadge> {
        self.dlc_updates
            .iter()
            .rev()
            .find(|(card, _)| card.appid.as_str() == appid)
            .map(|(_, badge)| *badge)
    }
}

impl Renderer for RecordingRenderer {
    fn render_page(&mut self, page: &RenderedPage) {
        self.pages.push(page.clone());
    }

    fn update_achievement_badge(&mut self, card: &CardHandle, badge: &AchievementBadge) {
        self.achievement_updates.push((card.clone(), *badge));
    }

    fn update_dlc_badge(&mut self, card: &CardHandle, badge: &DlcBadge) {
        self.dlc_updates.push((card.clone(), *badge));
    }

    fn library_loading(&mut self) {
        self.loading += 1;
    }

    fn library_failed(&mut self, error: &DashboardError) {
        self.failures.push(error.clone());
    }

    fn total_playtime(&mut self, hours: u64) {
        self.playtime = Some(hours);
    }

    fn completion_summary(&mut self, state: &CompletionState) {
        self.completion.push(state.clone());
    }
}
