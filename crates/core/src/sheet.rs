//! Achievement sheet for a single title: schema joined with the player's
//! unlock state and global rarity

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

use crate::models::{AppId, GlobalRarity, PlayerAchievement, SchemaAchievement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    /// Ultra-rare, under 2% of players
    Epic,
}

impl RarityTier {
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 40.0 {
            RarityTier::Common
        } else if percent >= 10.0 {
            RarityTier::Uncommon
        } else if percent >= 2.0 {
            RarityTier::Rare
        } else {
            RarityTier::Epic
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RarityTier::Common => "common",
            RarityTier::Uncommon => "uncommon",
            RarityTier::Rare => "rare",
            RarityTier::Epic => "epic",
        }
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AchievementRow {
    /// Technical name from the schema, or the display name when it has none
    pub key: String,
    pub name: String,
    pub description: String,
    /// Colored icon when unlocked, gray otherwise
    pub icon_url: String,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub global_percent: Option<f64>,
    pub rarity: Option<RarityTier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AchievementSheet {
    pub appid: AppId,
    pub title: String,
    /// Schema order, locked rows included
    pub rows: Vec<AchievementRow>,
}

impl AchievementSheet {
    pub fn unlocked_count(&self) -> usize {
        self.rows.iter().filter(|r| r.unlocked).count()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Non-empty lookup keys in join order: technical name, then display name
fn join_keys(schema: &SchemaAchievement) -> impl Iterator<Item = &str> {
    [schema.name.as_str(), schema.display_name.as_str()]
        .into_iter()
        .filter(|k| !k.is_empty())
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, schema: &SchemaAchievement) -> Option<&'a T> {
    join_keys(schema).find_map(|k| map.get(k))
}

pub fn build_sheet(
    appid: AppId,
    title: String,
    schema: &[SchemaAchievement],
    player: &HashMap<String, PlayerAchievement>,
    rarity: &GlobalRarity,
) -> AchievementSheet {
    let rows = schema
        .iter()
        .map(|a| {
            let state = lookup(player, a).copied().unwrap_or_default();
            let unlocked = state.is_unlocked();
            let global_percent = join_keys(a).find_map(|k| rarity.percent(k));
            let name = if a.display_name.is_empty() { a.name.clone() } else { a.display_name.clone() };

            AchievementRow {
                key: a.key().to_string(),
                name,
                description: a.description.clone(),
                icon_url: if unlocked { a.icon.clone() } else { a.icongray.clone() },
                unlocked,
                unlocked_at: state.unlocked_at(),
                global_percent,
                rarity: global_percent.map(RarityTier::from_percent),
            }
        })
        .collect();

    AchievementSheet { appid, title, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str, display: &str) -> SchemaAchievement {
        SchemaAchievement {
            name: name.to_string(),
            display_name: display.to_string(),
            description: format!("{} description", display),
            icon: format!("{}.jpg", name),
            icongray: format!("{}_gray.jpg", name),
        }
    }

    #[test]
    fn rarity_boundaries() {
        assert_eq!(RarityTier::from_percent(40.0), RarityTier::Common);
        assert_eq!(RarityTier::from_percent(39.9), RarityTier::Uncommon);
        assert_eq!(RarityTier::from_percent(10.0), RarityTier::Uncommon);
        assert_eq!(RarityTier::from_percent(9.9), RarityTier::Rare);
        assert_eq!(RarityTier::from_percent(2.0), RarityTier::Rare);
        assert_eq!(RarityTier::from_percent(1.9), RarityTier::Epic);
        assert_eq!(RarityTier::from_percent(0.0), RarityTier::Epic);
        assert_eq!(RarityTier::from_percent(100.0), RarityTier::Common);
    }

    #[test]
    fn joins_by_name_then_display_name_in_schema_order() {
        let schema = vec![schema("ACH_WIN", "Winner"), schema("ACH_LOSE", "Loser"), schema("ACH_HIDDEN", "Hidden")];

        let mut player = HashMap::new();
        player.insert("ACH_HIDDEN".to_string(), PlayerAchievement { achieved: 1, unlocktime: 1_700_000_000 });
        // Keyed by display name only
        player.insert("Winner".to_string(), PlayerAchievement { achieved: 1, unlocktime: 0 });
        player.insert("ACH_LOSE".to_string(), PlayerAchievement { achieved: 0, unlocktime: 0 });

        let mut pct = HashMap::new();
        pct.insert("ACH_WIN".to_string(), 55.0);
        pct.insert("Loser".to_string(), 1.5);
        let rarity = GlobalRarity::new(pct);

        let sheet = build_sheet("10".into(), "Game".to_string(), &schema, &player, &rarity);
        let keys: Vec<&str> = sheet.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["ACH_WIN", "ACH_LOSE", "ACH_HIDDEN"]);
        assert_eq!(sheet.unlocked_count(), 2);

        let win = &sheet.rows[0];
        assert!(win.unlocked);
        assert_eq!(win.icon_url, "ACH_WIN.jpg");
        assert_eq!(win.rarity, Some(RarityTier::Common));
        assert!(win.unlocked_at.is_none());

        let lose = &sheet.rows[1];
        assert!(!lose.unlocked);
        assert_eq!(lose.icon_url, "ACH_LOSE_gray.jpg");
        assert_eq!(lose.rarity, Some(RarityTier::Epic));

        let hidden = &sheet.rows[2];
        assert_eq!(hidden.unlocked_at.map(|d| d.timestamp()), Some(1_700_000_000));
        assert_eq!(hidden.global_percent, None);
        assert_eq!(hidden.rarity, None);
    }

    #[test]
    fn entries_without_technical_name_join_by_display_name() {
        let schema = vec![schema("A", "Alpha"), schema("", "Beta")];

        let mut player = HashMap::new();
        player.insert("Beta".to_string(), PlayerAchievement { achieved: 1, unlocktime: 0 });
        // An empty key must not match nameless entries
        player.insert(String::new(), PlayerAchievement { achieved: 1, unlocktime: 0 });
        let mut pct = HashMap::new();
        pct.insert("Beta".to_string(), 25.0);

        let sheet = build_sheet("1".into(), "Game".to_string(), &schema, &player, &GlobalRarity::new(pct));
        assert_eq!(sheet.rows.len(), 2);
        assert!(!sheet.rows[0].unlocked);
        assert_eq!(sheet.rows[1].key, "Beta");
        assert_eq!(sheet.rows[1].name, "Beta");
        assert!(sheet.rows[1].unlocked);
        assert_eq!(sheet.rows[1].rarity, Some(RarityTier::Uncommon));
    }

    #[test]
    fn missing_player_data_means_locked() {
        let sheet = build_sheet(
            "1".into(),
            "Game".to_string(),
            &[schema("A", "")],
            &HashMap::new(),
            &GlobalRarity::default(),
        );
        assert_eq!(sheet.rows.len(), 1);
        assert!(!sheet.rows[0].unlocked);
        assert_eq!(sheet.rows[0].name, "A");
    }
}
