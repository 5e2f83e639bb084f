use learn_core::achievements::{self, AchievementRule, CATALOG, RULES};
use learn_core::model::{AchievementId, ProgressRecord};
use tracing::info;

use crate::progress_service::ProgressStore;

/// Toast payload for a freshly unlocked achievement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementNotice {
    pub id: AchievementId,
    pub title: String,
    pub description: String,
}

/// Gallery entry for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementBadge {
    pub id: AchievementId,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked: bool,
}

/// Stateless evaluator over a fixed rule table.
#[derive(Debug, Clone, Copy)]
pub struct AchievementEvaluator {
    rules: &'static [AchievementRule],
}

impl Default for AchievementEvaluator {
    fn default() -> Self {
        Self { rules: RULES }
    }
}

impl AchievementEvaluator {
    /// Evaluator over the built-in rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rules(rules: &'static [AchievementRule]) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &'static [AchievementRule] {
        self.rules
    }

    /// Unlock every rule that now holds, persist, and return the new ids in
    /// rule order. Existing achievements are never removed.
    pub async fn evaluate(&self, store: &mut ProgressStore) -> Vec<AchievementId> {
        let unlocked = achievements::evaluate(store.record_mut(), self.rules);
        for id in &unlocked {
            info!(achievement = %id, "achievement unlocked");
        }
        store.persist().await;
        unlocked
    }

    /// Notification text for each id, falling back to the raw id for
    /// achievements without catalog metadata.
    #[must_use]
    pub fn notices(&self, ids: &[AchievementId]) -> Vec<AchievementNotice> {
        ids.iter()
            .map(|id| match achievements::info(id.as_str()) {
                Some(info) => AchievementNotice {
                    id: id.clone(),
                    title: info.title.to_owned(),
                    description: info.description.to_owned(),
                },
                None => AchievementNotice {
                    id: id.clone(),
                    title: id.to_string(),
                    description: String::new(),
                },
            })
            .collect()
    }

    /// Every catalog achievement with its unlock state, followed by any
    /// unlocked ids the catalog does not describe.
    #[must_use]
    pub fn gallery(&self, record: &ProgressRecord) -> Vec<AchievementBadge> {
        let mut badges: Vec<AchievementBadge> = CATALOG
            .iter()
            .map(|info| AchievementBadge {
                id: AchievementId::new(info.id),
                title: info.title.to_owned(),
                description: info.description.to_owned(),
                icon: info.icon.to_owned(),
                unlocked: record.has_achievement(info.id),
            })
            .collect();

        for id in record.achievements() {
            if achievements::info(id.as_str()).is_none() {
                badges.push(AchievementBadge {
                    id: id.clone(),
                    title: id.to_string(),
                    description: String::new(),
                    icon: "🏆".to_owned(),
                    unlocked: true,
                });
            }
        }
        badges
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
