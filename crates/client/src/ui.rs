//! Plain-text rendering of the library page and achievement sheets

use chrono::{DateTime, Utc};
use std::io::{self, Write};

use steamdash_core::{
    AchievementBadge, AchievementSheet, Card, CardHandle, CompletionState, DashboardError, DlcBadge, Renderer,
    RenderedPage, UserProfile,
};

/// Renderer that keeps the latest state of every card and prints it on demand
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    cards: Vec<Card>,
    page_label: String,
    filtered_count: usize,
    loading: bool,
    error: Option<String>,
    playtime_hours: Option<u64>,
    completion: Option<CompletionState>,
}

/// "Never" for titles without a recorded session
pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Never".to_string())
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Updates for a card that is no longer on screen are ignored
    fn card_mut(&mut self, handle: &CardHandle) -> Option<&mut Card> {
        self.cards
            .get_mut(handle.slot)
            .filter(|card| card.handle.appid == handle.appid)
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        if let Some(error) = &self.error {
            writeln!(out, "Error: {}", error)?;
            return Ok(());
        }
        if self.loading {
            writeln!(out, "Loading library...")?;
            return Ok(());
        }

        if let Some(hours) = self.playtime_hours {
            write!(out, "Total playtime: {}h", hours)?;
        }
        if let Some(completion) = &self.completion {
            write!(out, "  |  Completion: {}", completion)?;
        }
        writeln!(out)?;
        writeln!(out, "{} games  |  {}", self.filtered_count, self.page_label)?;
        writeln!(out)?;

        if self.cards.is_empty() {
            writeln!(out, "No games match the current filters.")?;
            return Ok(());
        }

        for card in &self.cards {
            writeln!(
                out,
                "{:>8}  {:<40}  {:>7.1}h  {:<10}  {:<16}  {}",
                card.game.appid.as_str(),
                truncate(&card.game.name, 40),
                card.game.playtime_hours(),
                format_timestamp(card.game.last_played),
                card.achievements.to_string(),
                card.dlc
            )?;
        }
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

impl Renderer for TerminalRenderer {
    fn render_page(&mut self, page: &RenderedPage) {
        self.loading = false;
        self.error = None;
        self.cards = page.cards.clone();
        self.page_label = page.page_label();
        self.filtered_count = page.filtered_count;
    }

    fn update_achievement_badge(&mut self, card: &CardHandle, badge: &AchievementBadge) {
        if let Some(card) = self.card_mut(card) {
            card.achievements = *badge;
        }
    }

    fn update_dlc_badge(&mut self, card: &CardHandle, badge: &DlcBadge) {
        if let Some(card) = self.card_mut(card) {
            card.dlc = *badge;
        }
    }

    fn library_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn library_failed(&mut self, error: &DashboardError) {
        self.loading = false;
        self.cards.clear();
        self.error = Some(error.to_string());
    }

    fn total_playtime(&mut self, hours: u64) {
        self.playtime_hours = Some(hours);
    }

    fn completion_summary(&mut self, state: &CompletionState) {
        self.completion = Some(state.clone());
    }
}

pub fn write_completion(state: &CompletionState, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Completion: {}", state)?;
    if let CompletionState::Failed(reason) = state {
        writeln!(out, "  {}", reason)?;
    }
    Ok(())
}

pub fn write_sheet(sheet: &AchievementSheet, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "{} ({})  {}/{} unlocked",
        sheet.title,
        sheet.appid,
        sheet.unlocked_count(),
        sheet.rows.len()
    )?;
    if sheet.is_empty() {
        writeln!(out, "This game has no achievements.")?;
        return Ok(());
    }

    for row in &sheet.rows {
        let mark = if row.unlocked { "✔" } else { "·" };
        let rarity = match (row.global_percent, row.rarity) {
            (Some(pct), Some(tier)) => format!("{:>5.1}% {}", pct, tier),
            _ => "     -".to_string(),
        };
        let when = if row.unlocked {
            format_timestamp(row.unlocked_at)
        } else {
            String::new()
        };
        writeln!(out, "{} {:<40} {:<16} {}", mark, truncate(&row.name, 40), rarity, when)?;
        if !row.description.is_empty() {
            writeln!(out, "    {}", row.description)?;
        }
    }
    Ok(())
}

pub fn write_profile(profile: &UserProfile, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{} ({})", profile.display_name, profile.steam_id)?;
    if let Some(url) = &profile.profile_url {
        writeln!(out, "{}", url)?;
    }
    Ok(())
}
