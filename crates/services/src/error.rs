//! Shared error types for the services crate.

use thiserror::Error;

use storage::sqlite::SqliteInitError;

use crate::quiz::{QuizAction, QuizState};

/// Errors emitted by the quiz engine.
///
/// An invalid transition never changes session state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("cannot {action} while the quiz is {state}")]
    InvalidTransition { action: QuizAction, state: QuizState },
}

/// Errors emitted while assembling a `LearningContext`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContextError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error("built-in quiz content is invalid: {0}")]
    Content(#[from] learn_core::Error),
}
