//! Achievement rules and catalog.
//!
//! Rules are data: each entry pairs an id with a predicate over the current
//! [`ProgressRecord`]. Evaluation walks the table in order and unlocks every
//! rule whose predicate holds and whose id is not yet present. Nothing here
//! ever removes an achievement, so unlocking is monotonic regardless of what a
//! rule's predicate later returns.

use crate::model::{AchievementId, ProgressRecord};

pub const FIRST_LESSON: &str = "first-lesson";
pub const WEEK_WARRIOR: &str = "week-warrior";
pub const QUIZ_MASTER: &str = "quiz-master";
pub const PROJECT_BUILDER: &str = "project-builder";

/// Completed lessons required for `week-warrior`.
pub const WEEK_WARRIOR_LESSONS: usize = 7;

//
// ─── RULES ─────────────────────────────────────────────────────────────────────
//

/// A single unlock rule.
#[derive(Debug, Clone, Copy)]
pub struct AchievementRule {
    pub id: &'static str,
    pub condition: fn(&ProgressRecord) -> bool,
}

fn first_lesson(record: &ProgressRecord) -> bool {
    record.completed_lesson_count() == 1
}

fn week_warrior(record: &ProgressRecord) -> bool {
    record.completed_lesson_count() >= WEEK_WARRIOR_LESSONS
}

/// Built-in rules, in evaluation order.
pub const RULES: &[AchievementRule] = &[
    AchievementRule {
        id: FIRST_LESSON,
        condition: first_lesson,
    },
    AchievementRule {
        id: WEEK_WARRIOR,
        condition: week_warrior,
    },
];

/// Apply `rules` to `record`, returning newly unlocked ids in rule order.
///
/// Each rule is checked against the achievements present at the time it runs,
/// so a single pass can unlock several rules.
pub fn evaluate(record: &mut ProgressRecord, rules: &[AchievementRule]) -> Vec<AchievementId> {
    let mut unlocked = Vec::new();
    for rule in rules {
        if record.has_achievement(rule.id) || !(rule.condition)(record) {
            continue;
        }
        let id = AchievementId::new(rule.id);
        if record.unlock(id.clone()) {
            unlocked.push(id);
        }
    }
    unlocked
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Display metadata for an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

/// Every achievement the dashboard knows about, including ones that no rule
/// unlocks yet.
pub const CATALOG: &[AchievementInfo] = &[
    AchievementInfo {
        id: FIRST_LESSON,
        title: "First Steps",
        description: "Completed your first lesson!",
        icon: "🎯",
    },
    AchievementInfo {
        id: WEEK_WARRIOR,
        title: "Week Warrior",
        description: "Completed 7 lessons!",
        icon: "🗓️",
    },
    AchievementInfo {
        id: QUIZ_MASTER,
        title: "Quiz Master",
        description: "Scored 100% on a quiz.",
        icon: "🧠",
    },
    AchievementInfo {
        id: PROJECT_BUILDER,
        title: "Project Builder",
        description: "Finished a project.",
        icon: "🔨",
    },
];

#[must_use]
pub fn info(id: &str) -> Option<&'static AchievementInfo> {
    CATALOG.iter().find(|entry| entry.id == id)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
