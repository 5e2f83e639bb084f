use thiserror::Error;

use crate::model::{ParseIdError, QuestionError, QuizError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
