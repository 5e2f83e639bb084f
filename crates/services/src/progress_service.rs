use std::fmt;
use std::sync::Arc;

use learn_core::model::{AchievementId, LessonId, ProgressRecord, ProjectId, QuizId};
use serde_json::Value;
use storage::progress_codec::{Decoded, FreshReason, decode_progress, encode_progress};
use storage::repository::{KeyValueStore, PROGRESS_KEY};
use tracing::{debug, info, warn};

use crate::Clock;
use crate::achievement_service::AchievementEvaluator;

/// Owns the learner's `ProgressRecord` and writes it through on every mutation.
///
/// Mutating methods take `&mut self`, so each load/mutate/persist cycle runs
/// to completion before anything else can touch the record. Hosts that share
/// the store across tasks wrap it in an async mutex.
///
/// Storage failures never reach callers: reads fall back to an empty record
/// and failed writes leave the in-memory record authoritative. A store whose
/// initial read failed is non-durable and never writes, so whatever is still
/// stored survives the session.
pub struct ProgressStore {
    clock: Clock,
    kv: Arc<dyn KeyValueStore>,
    record: ProgressRecord,
    evaluator: AchievementEvaluator,
    durable: bool,
}

impl ProgressStore {
    /// Load the stored record, initializing or migrating it as needed.
    pub async fn load(clock: Clock, kv: Arc<dyn KeyValueStore>) -> Self {
        Self::load_with_evaluator(clock, kv, AchievementEvaluator::new()).await
    }

    /// Like [`ProgressStore::load`], with a custom achievement rule set.
    pub async fn load_with_evaluator(
        clock: Clock,
        kv: Arc<dyn KeyValueStore>,
        evaluator: AchievementEvaluator,
    ) -> Self {
        let (raw, read_ok) = match kv.get(PROGRESS_KEY).await {
            Ok(raw) => (raw, true),
            Err(err) => {
                warn!(error = %err, "progress storage unavailable, continuing with an empty record");
                (None, false)
            }
        };

        let decoded = decode_progress(raw.as_deref(), clock.now());
        match &decoded {
            Decoded::Fresh(_, FreshReason::Absent) => debug!("no stored progress, initializing"),
            Decoded::Fresh(_, reason) => warn!(?reason, "discarding unreadable stored progress"),
            Decoded::Migrated(_) => info!("migrated stored progress to the current format"),
            Decoded::Current(_) => debug!("loaded stored progress"),
        }

        let needs_persist = decoded.needs_persist();
        let store = Self {
            clock,
            kv,
            record: decoded.into_record(),
            evaluator,
            durable: read_ok,
        };
        if needs_persist {
            store.persist().await;
        }
        store
    }

    #[must_use]
    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub(crate) fn record_mut(&mut self) -> &mut ProgressRecord {
        &mut self.record
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    /// `false` when the initial read failed and writes are suppressed.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    #[must_use]
    pub fn evaluator(&self) -> AchievementEvaluator {
        self.evaluator
    }

    /// Mark a lesson complete, persist, and re-evaluate achievements.
    ///
    /// Returns the achievements unlocked by this completion, in rule order.
    /// Completing the same lesson again only refreshes its timestamp.
    pub async fn mark_lesson_complete(&mut self, lesson_id: LessonId) -> Vec<AchievementId> {
        let now = self.clock.now();
        debug!(lesson = %lesson_id, "marking lesson complete");
        self.record.complete_lesson(lesson_id, now);
        self.persist().await;

        let evaluator = self.evaluator;
        evaluator.evaluate(self).await
    }

    /// Store the latest percentage for a quiz and persist.
    ///
    /// Does not re-evaluate achievements; callers that want quiz-driven
    /// unlocks run the evaluator themselves. `percentage` must be in `0..=100`.
    ///
    /// Returns whether the write reached durable storage.
    pub async fn record_quiz_score(&mut self, quiz_id: QuizId, percentage: u8) -> bool {
        debug_assert!(percentage <= 100, "quiz percentage out of range: {percentage}");
        let now = self.clock.now();
        debug!(quiz = %quiz_id, percentage, "recording quiz score");
        self.record.set_quiz_score(quiz_id, percentage, now);
        self.persist().await
    }

    /// Replace the opaque status payload of a project and persist.
    pub async fn update_project(&mut self, project_id: ProjectId, status: Value) -> bool {
        self.record.set_project(project_id, status);
        self.persist().await
    }

    /// Write the full record to storage.
    ///
    /// Returns `false` if the write failed or the store is non-durable; the
    /// in-memory record is kept either way.
    pub async fn persist(&self) -> bool {
        if !self.durable {
            debug!("progress store is non-durable, skipping write");
            return false;
        }
        let raw = match encode_progress(&self.record) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "failed to encode progress");
                return false;
            }
        };
        match self.kv.set(PROGRESS_KEY, &raw).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to persist progress, keeping in-memory state");
                false
            }
        }
    }
}

impl fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressStore")
            .field("clock", &self.clock)
            .field("durable", &self.durable)
            .field("lessons_len", &self.record.lessons().len())
            .field("quizzes_len", &self.record.quizzes().len())
            .field("achievements", &self.record.achievements())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
