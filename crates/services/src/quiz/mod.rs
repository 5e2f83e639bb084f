mod feedback;
mod session;
mod timer;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::QuizSessionError;
pub use feedback::{AnswerFeedback, QuizProgress, QuizResult, Verdict};
pub use session::{AnswerRecord, QuizAction, QuizSession, QuizState};
pub use timer::{FEEDBACK_DELAY, FeedbackTimer, QuizEvent, RunId};
pub use workflow::{AdvanceOutcome, QuizConfig, QuizLoopService, QuizOutcome, QuizRun};
