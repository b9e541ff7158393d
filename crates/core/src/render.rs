//! Renderer collaborator
//!
//! The view hands the renderer a page of cards once, then addresses later
//! updates to individual cards through their `CardHandle`.

use crate::error::DashboardError;
use crate::models::{AchievementBadge, AchievementSummary, AppId, CompletionState, DlcBadge, Game};

/// Stable reference to a card on the currently rendered page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardHandle {
    /// Position on the page, starting at 0
    pub slot: usize,
    pub appid: AppId,
}

/// One game as shown on the page, with whatever is already known about it
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub handle: CardHandle,
    pub game: Game,
    pub achievements: AchievementBadge,
    pub dlc: DlcBadge,
}

impl Card {
    pub fn new(slot: usize, game: Game, cached: Option<&AchievementSummary>) -> Self {
        Self {
            handle: CardHandle {
                slot,
                appid: game.appid.clone(),
            },
            game,
            achievements: AchievementBadge::from_cached(cached),
            dlc: DlcBadge::Loading,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub cards: Vec<Card>,
    pub page_index: usize,
    pub page_count: usize,
    pub filtered_count: usize,
}

impl RenderedPage {
    pub fn handles(&self) -> Vec<CardHandle> {
        self.cards.iter().map(|c| c.handle.clone()).collect()
    }

    /// "Page 1 / 3" style label, one-based
    pub fn page_label(&self) -> String {
        format!("Page {} / {}", self.page_index + 1, self.page_count)
    }
}

/// UI side of the library view
pub trait Renderer {
    /// Called every time the visible page is (re)computed
    fn render_page(&mut self, page: &RenderedPage);

    /// Called as the achievement batch for the page resolves
    fn update_achievement_badge(&mut self, card: &CardHandle, badge: &AchievementBadge);

    /// Called independently for every card as its DLC details resolve
    fn update_dlc_badge(&mut self, card: &CardHandle, badge: &DlcBadge);

    fn library_loading(&mut self) {}

    /// The library could not be loaded; no partial list should be shown
    fn library_failed(&mut self, _error: &DashboardError) {}

    fn total_playtime(&mut self, _hours: u64) {}

    fn completion_summary(&mut self, _state: &CompletionState) {}
}
