use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::ids::{AchievementId, LessonId, ProjectId, QuizId};

//
// ─── ENTRIES ───────────────────────────────────────────────────────────────────
//

/// Completion state of a single lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonProgress {
    pub completed: bool,
    pub completed_at: DateTime<Utc>,
}

/// Latest score recorded for a quiz. Only the most recent attempt is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    /// Percentage in `0..=100`.
    pub score: u8,
    pub completed_at: DateTime<Utc>,
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// The single persisted aggregate of a learner's completions and unlocks.
///
/// A `ProgressRecord` is always fully shaped: every collection exists, even if
/// empty. Achievements can be added but never removed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressRecord {
    lessons: BTreeMap<LessonId, LessonProgress>,
    quizzes: BTreeMap<QuizId, QuizScore>,
    projects: BTreeMap<ProjectId, Value>,
    streak: u32,
    total_time: u64,
    achievements: Vec<AchievementId>,
}

impl ProgressRecord {
    /// An empty record: no lessons, quizzes, projects or achievements.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// Duplicate achievement ids are collapsed, keeping the first occurrence.
    #[must_use]
    pub fn from_persisted(
        lessons: BTreeMap<LessonId, LessonProgress>,
        quizzes: BTreeMap<QuizId, QuizScore>,
        projects: BTreeMap<ProjectId, Value>,
        streak: u32,
        total_time: u64,
        achievements: impl IntoIterator<Item = AchievementId>,
    ) -> Self {
        let mut record = Self {
            lessons,
            quizzes,
            projects,
            streak,
            total_time,
            achievements: Vec::new(),
        };
        for id in achievements {
            record.unlock(id);
        }
        record
    }

    #[must_use]
    pub fn lessons(&self) -> &BTreeMap<LessonId, LessonProgress> {
        &self.lessons
    }

    #[must_use]
    pub fn lesson(&self, id: &str) -> Option<&LessonProgress> {
        self.lessons.get(id)
    }

    #[must_use]
    pub fn quizzes(&self) -> &BTreeMap<QuizId, QuizScore> {
        &self.quizzes
    }

    #[must_use]
    pub fn quiz_score(&self, id: &str) -> Option<&QuizScore> {
        self.quizzes.get(id)
    }

    #[must_use]
    pub fn projects(&self) -> &BTreeMap<ProjectId, Value> {
        &self.projects
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn total_time(&self) -> u64 {
        self.total_time
    }

    /// Unlocked achievements in unlock order.
    #[must_use]
    pub fn achievements(&self) -> &[AchievementId] {
        &self.achievements
    }

    #[must_use]
    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a.as_str() == id)
    }

    /// Number of lessons whose entry is marked completed.
    #[must_use]
    pub fn completed_lesson_count(&self) -> usize {
        self.lessons.values().filter(|l| l.completed).count()
    }

    /// Mark a lesson complete. Re-completing only refreshes the timestamp.
    pub fn complete_lesson(&mut self, id: LessonId, at: DateTime<Utc>) {
        self.lessons.insert(
            id,
            LessonProgress {
                completed: true,
                completed_at: at,
            },
        );
    }

    /// Store the latest score for a quiz, replacing any earlier attempt.
    pub fn set_quiz_score(&mut self, id: QuizId, score: u8, at: DateTime<Utc>) {
        self.quizzes.insert(
            id,
            QuizScore {
                score,
                completed_at: at,
            },
        );
    }

    pub fn set_project(&mut self, id: ProjectId, status: Value) {
        self.projects.insert(id, status);
    }

    /// Add an achievement if it is not already present.
    ///
    /// Returns `true` when the id was newly added.
    pub fn unlock(&mut self, id: AchievementId) -> bool {
        if self.achievements.contains(&id) {
            return false;
        }
        self.achievements.push(id);
        true
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
