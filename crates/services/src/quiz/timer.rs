use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How long answer feedback stays on screen before the quiz moves on.
pub const FEEDBACK_DELAY: Duration = Duration::from_millis(2000);

/// Identifies one `QuizRun`, so events from a discarded run can be told apart.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunId({})", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events delivered to the quiz event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizEvent {
    /// The feedback delay for the `answer_count`-th answer of `run_id` elapsed.
    AdvanceDue { run_id: RunId, answer_count: usize },
}

/// A scheduled feedback advance.
///
/// The timer only sends a `QuizEvent`; it never touches session state. Dropping
/// the timer aborts the pending task.
pub struct FeedbackTimer {
    handle: JoinHandle<()>,
}

impl FeedbackTimer {
    /// Spawn a task that sends `event` on `events` after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn schedule(delay: Duration, event: QuizEvent, events: UnboundedSender<QuizEvent>) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone if the run was dropped meanwhile.
            let _ = events.send(event);
        });
        Self { handle }
    }

    /// Stop the timer if it has not fired yet.
    pub fn cancel(self) {
        drop(self);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for FeedbackTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl fmt::Debug for FeedbackTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackTimer")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}
