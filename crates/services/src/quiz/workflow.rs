use std::time::Duration;

use learn_core::model::Quiz;
use rand::rng;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::error::QuizSessionError;
use crate::progress_service::ProgressStore;
use super::feedback::{AnswerFeedback, QuizResult};
use super::session::{QuizSession, QuizState};
use super::timer::{FEEDBACK_DELAY, FeedbackTimer, QuizEvent, RunId};

/// Tunables for quiz runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizConfig {
    pub feedback_delay: Duration,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            feedback_delay: FEEDBACK_DELAY,
        }
    }
}

/// Final outcome of a quiz run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    pub result: QuizResult,
    /// Whether the score reached durable storage.
    pub persisted: bool,
}

/// What happened when the run was asked to leave the feedback screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The next question is ready.
    NextQuestion,
    /// The last question was answered and the score was recorded.
    Completed(QuizOutcome),
    /// The event belonged to another run or an earlier answer.
    Ignored,
}

//
// ─── RUN ───────────────────────────────────────────────────────────────────────
//

/// A live quiz session plus its event channel and pending feedback timer.
///
/// Dropping the run cancels any pending timer.
#[derive(Debug)]
pub struct QuizRun {
    id: RunId,
    session: QuizSession,
    events_tx: UnboundedSender<QuizEvent>,
    events_rx: UnboundedReceiver<QuizEvent>,
    pending: Option<FeedbackTimer>,
    outcome: Option<QuizOutcome>,
}

impl QuizRun {
    fn new(session: QuizSession) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            id: RunId::new(),
            session,
            events_tx,
            events_rx,
            pending: None,
            outcome: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn has_pending_advance(&self) -> bool {
        self.pending.is_some()
    }

    /// Set once the run completes.
    #[must_use]
    pub fn outcome(&self) -> Option<QuizOutcome> {
        self.outcome
    }

    /// Wait for the next event addressed to this run.
    ///
    /// Returns `None` only if nothing is pending; otherwise resolves once the
    /// feedback delay elapses.
    pub async fn next_event(&mut self) -> Option<QuizEvent> {
        if self.pending.is_none() && self.events_rx.is_empty() {
            return None;
        }
        self.events_rx.recv().await
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Orchestrates quiz runs: answer timers, advancing and score persistence.
#[derive(Debug, Clone, Default)]
pub struct QuizLoopService {
    config: QuizConfig,
    shuffle_questions: bool,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(config: QuizConfig) -> Self {
        Self {
            config,
            shuffle_questions: false,
        }
    }

    #[must_use]
    pub fn with_shuffle_questions(mut self, shuffle_questions: bool) -> Self {
        self.shuffle_questions = shuffle_questions;
        self
    }

    #[must_use]
    pub fn config(&self) -> QuizConfig {
        self.config
    }

    /// Start a fresh run of `quiz`. Runs are never resumed from storage.
    #[must_use]
    pub fn start(&self, quiz: Quiz) -> QuizRun {
        let mut session = QuizSession::new(quiz);
        if self.shuffle_questions {
            session.shuffle_questions(&mut rng());
        }
        let run = QuizRun::new(session);
        debug!(run = %run.id, quiz = %run.session.quiz_id(), "quiz run started");
        run
    }

    /// Answer the current question and schedule the automatic advance.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidTransition` unless the run awaits an answer.
    pub fn select_answer(
        &self,
        run: &mut QuizRun,
        selected_index: usize,
    ) -> Result<AnswerFeedback, QuizSessionError> {
        let feedback = run.session.select_answer(selected_index)?;
        debug!(
            run = %run.id,
            question = %feedback.question_id,
            correct = feedback.was_correct,
            "answer recorded"
        );

        let event = QuizEvent::AdvanceDue {
            run_id: run.id,
            answer_count: run.session.answers().len(),
        };
        run.pending = Some(FeedbackTimer::schedule(
            self.config.feedback_delay,
            event,
            run.events_tx.clone(),
        ));
        Ok(feedback)
    }

    /// Apply an event from the run's channel.
    ///
    /// Events from another run, or for an answer that was already advanced
    /// past, are ignored.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError` if the session rejects the advance.
    pub async fn handle_event(
        &self,
        run: &mut QuizRun,
        event: QuizEvent,
        progress: &mut ProgressStore,
    ) -> Result<AdvanceOutcome, QuizSessionError> {
        match event {
            QuizEvent::AdvanceDue {
                run_id,
                answer_count,
            } => {
                let current = run_id == run.id
                    && answer_count == run.session.answers().len()
                    && run.session.state() == QuizState::ShowingFeedback;
                if !current {
                    debug!(run = %run.id, ?event, "ignoring stale quiz event");
                    return Ok(AdvanceOutcome::Ignored);
                }
                run.pending = None;
                self.advance(run, progress).await
            }
        }
    }

    /// Skip the remaining feedback delay and advance now.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidTransition` unless the run is showing feedback.
    pub async fn advance_now(
        &self,
        run: &mut QuizRun,
        progress: &mut ProgressStore,
    ) -> Result<AdvanceOutcome, QuizSessionError> {
        if let Some(timer) = run.pending.take() {
            timer.cancel();
        }
        self.advance(run, progress).await
    }

    async fn advance(
        &self,
        run: &mut QuizRun,
        progress: &mut ProgressStore,
    ) -> Result<AdvanceOutcome, QuizSessionError> {
        match run.session.advance()? {
            QuizState::Completed => {
                let result = run.session.result()?;
                let persisted = progress
                    .record_quiz_score(run.session.quiz_id().clone(), result.percentage)
                    .await;
                info!(
                    quiz = %run.session.quiz_id(),
                    score = result.score,
                    total = result.total,
                    percentage = result.percentage,
                    "quiz completed"
                );
                let outcome = QuizOutcome { result, persisted };
                run.outcome = Some(outcome);
                Ok(AdvanceOutcome::Completed(outcome))
            }
            QuizState::AwaitingAnswer | QuizState::ShowingFeedback => {
                Ok(AdvanceOutcome::NextQuestion)
            }
        }
    }
}
