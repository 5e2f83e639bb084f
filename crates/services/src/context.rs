use std::sync::Arc;

use learn_core::model::{AchievementId, LessonId, Quiz, QuizId, sample_quiz};
use storage::repository::Storage;

use crate::Clock;
use crate::achievement_service::{AchievementBadge, AchievementEvaluator, AchievementNotice};
use crate::error::{ContextError, QuizSessionError};
use crate::progress_service::ProgressStore;
use crate::quiz::{AdvanceOutcome, AnswerFeedback, QuizConfig, QuizEvent, QuizLoopService, QuizRun};

/// Everything a presentation layer needs, built once at startup and passed
/// around by reference.
#[derive(Debug)]
pub struct LearningContext {
    progress: ProgressStore,
    quiz_loop: QuizLoopService,
    quizzes: Vec<Quiz>,
}

impl LearningContext {
    /// Load progress from `storage` and assemble the services.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::Content` if the built-in quiz catalog is invalid.
    pub async fn new(
        clock: Clock,
        storage: &Storage,
        config: QuizConfig,
    ) -> Result<Self, ContextError> {
        let quizzes = vec![sample_quiz()?];
        let progress = ProgressStore::load(clock, Arc::clone(&storage.kv)).await;
        Ok(Self {
            progress,
            quiz_loop: QuizLoopService::new(config),
            quizzes,
        })
    }

    /// Non-persistent context, e.g. for tests or when storage is unavailable.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::Content` if the built-in quiz catalog is invalid.
    pub async fn in_memory(clock: Clock) -> Result<Self, ContextError> {
        Self::new(clock, &Storage::in_memory(), QuizConfig::default()).await
    }

    /// Context backed by `SQLite` storage at `db_url`.
    ///
    /// # Errors
    ///
    /// Returns `ContextError` if storage initialization fails or the built-in
    /// quiz catalog is invalid.
    pub async fn sqlite(
        db_url: &str,
        clock: Clock,
        config: QuizConfig,
    ) -> Result<Self, ContextError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::new(clock, &storage, config).await
    }

    #[must_use]
    pub fn with_quiz_loop(mut self, quiz_loop: QuizLoopService) -> Self {
        self.quiz_loop = quiz_loop;
        self
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressStore {
        &mut self.progress
    }

    #[must_use]
    pub fn quiz_loop(&self) -> &QuizLoopService {
        &self.quiz_loop
    }

    #[must_use]
    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    #[must_use]
    pub fn quiz(&self, id: &QuizId) -> Option<&Quiz> {
        self.quizzes.iter().find(|quiz| quiz.id() == id)
    }

    #[must_use]
    pub fn achievements(&self) -> AchievementEvaluator {
        self.progress.evaluator()
    }

    /// Mark a lesson complete and return notices for anything it unlocked.
    pub async fn complete_lesson(&mut self, lesson_id: LessonId) -> Vec<AchievementNotice> {
        let unlocked: Vec<AchievementId> = self.progress.mark_lesson_complete(lesson_id).await;
        self.achievements().notices(&unlocked)
    }

    /// Start a fresh run of the catalog quiz `id`.
    #[must_use]
    pub fn start_quiz(&self, id: &QuizId) -> Option<QuizRun> {
        self.quiz(id).map(|quiz| self.quiz_loop.start(quiz.clone()))
    }

    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidTransition` unless the run awaits an answer.
    pub fn select_answer(
        &self,
        run: &mut QuizRun,
        selected_index: usize,
    ) -> Result<AnswerFeedback, QuizSessionError> {
        self.quiz_loop.select_answer(run, selected_index)
    }

    /// # Errors
    ///
    /// Returns `QuizSessionError` if the session rejects the advance.
    pub async fn handle_quiz_event(
        &mut self,
        run: &mut QuizRun,
        event: QuizEvent,
    ) -> Result<AdvanceOutcome, QuizSessionError> {
        self.quiz_loop
            .handle_event(run, event, &mut self.progress)
            .await
    }

    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidTransition` unless the run is showing feedback.
    pub async fn advance_quiz_now(
        &mut self,
        run: &mut QuizRun,
    ) -> Result<AdvanceOutcome, QuizSessionError> {
        self.quiz_loop.advance_now(run, &mut self.progress).await
    }

    #[must_use]
    pub fn gallery(&self) -> Vec<AchievementBadge> {
        self.achievements().gallery(self.progress.record())
    }
}
