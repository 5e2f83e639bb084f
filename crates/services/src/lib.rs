#![forbid(unsafe_code)]

pub mod achievement_service;
pub mod context;
pub mod error;
pub mod progress_service;
pub mod quiz;

pub use learn_core::Clock;

pub use achievement_service::{AchievementBadge, AchievementEvaluator, AchievementNotice};
pub use context::LearningContext;
pub use error::{ContextError, QuizSessionError};
pub use progress_service::ProgressStore;
pub use quiz::{
    AdvanceOutcome, AnswerFeedback, AnswerRecord, FEEDBACK_DELAY, QuizAction, QuizConfig,
    QuizEvent, QuizLoopService, QuizOutcome, QuizProgress, QuizResult, QuizRun, QuizSession,
    QuizState, RunId, Verdict,
};
