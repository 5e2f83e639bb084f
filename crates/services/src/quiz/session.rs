use std::fmt;

use learn_core::model::{Question, QuestionId, Quiz, QuizId};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::QuizSessionError;
use super::feedback::{AnswerFeedback, QuizProgress, QuizResult};

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where a quiz session is in its question loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    AwaitingAnswer,
    ShowingFeedback,
    Completed,
}

impl fmt::Display for QuizState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuizState::AwaitingAnswer => "awaiting an answer",
            QuizState::ShowingFeedback => "showing feedback",
            QuizState::Completed => "completed",
        })
    }
}

/// Operations that can be rejected by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizAction {
    SelectAnswer,
    Advance,
    Result,
}

impl fmt::Display for QuizAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuizAction::SelectAnswer => "select an answer",
            QuizAction::Advance => "advance",
            QuizAction::Result => "read the result",
        })
    }
}

/// One answered question, in answer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub selected_index: usize,
    pub was_correct: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One run through a quiz's questions.
///
/// `AwaitingAnswer -> ShowingFeedback -> (AwaitingAnswer | Completed)`.
/// Calls made in the wrong state return `QuizSessionError::InvalidTransition`
/// and leave the session untouched.
pub struct QuizSession {
    quiz_id: QuizId,
    title: String,
    questions: Vec<Question>,
    current: usize,
    score: usize,
    answers: Vec<AnswerRecord>,
    state: QuizState,
}

impl QuizSession {
    /// Start a session at the first question.
    #[must_use]
    pub fn new(quiz: Quiz) -> Self {
        let (quiz_id, title, questions) = quiz.into_parts();
        Self {
            quiz_id,
            title,
            questions,
            current: 0,
            score: 0,
            answers: Vec::new(),
            state: QuizState::AwaitingAnswer,
        }
    }

    /// Reorder questions before the first answer. Ignored once answering began.
    pub(crate) fn shuffle_questions<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.answers.is_empty() {
            self.questions.shuffle(rng);
        }
    }

    #[must_use]
    pub fn quiz_id(&self) -> &QuizId {
        &self.quiz_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Zero-based index of the question being asked or reviewed.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question on screen; `None` once the quiz is completed.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            QuizState::Completed => None,
            _ => self.questions.get(self.current),
        }
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        QuizProgress {
            total: self.total(),
            answered: self.answers.len(),
            remaining: self.total().saturating_sub(self.answers.len()),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == QuizState::Completed
    }

    fn require(&self, expected: QuizState, action: QuizAction) -> Result<(), QuizSessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(QuizSessionError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    /// Answer the current question.
    ///
    /// Indices past the last option are scored as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidTransition` unless awaiting an answer.
    pub fn select_answer(
        &mut self,
        selected_index: usize,
    ) -> Result<AnswerFeedback, QuizSessionError> {
        self.require(QuizState::AwaitingAnswer, QuizAction::SelectAnswer)?;
        let Some(question) = self.questions.get(self.current) else {
            return Err(QuizSessionError::InvalidTransition {
                action: QuizAction::SelectAnswer,
                state: self.state,
            });
        };

        let was_correct = question.is_correct(selected_index);
        let feedback = AnswerFeedback {
            question_id: question.id(),
            selected_index,
            correct_index: question.correct_index(),
            was_correct,
            explanation: question.explanation().to_owned(),
        };

        self.answers.push(AnswerRecord {
            question_id: feedback.question_id,
            selected_index,
            was_correct,
        });
        if was_correct {
            self.score += 1;
        }
        self.state = QuizState::ShowingFeedback;
        Ok(feedback)
    }

    /// Leave the feedback screen for the next question, or finish.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidTransition` unless showing feedback.
    pub fn advance(&mut self) -> Result<QuizState, QuizSessionError> {
        self.require(QuizState::ShowingFeedback, QuizAction::Advance)?;
        self.current += 1;
        self.state = if self.current < self.questions.len() {
            QuizState::AwaitingAnswer
        } else {
            QuizState::Completed
        };
        Ok(self.state)
    }

    /// Final score of a completed session.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidTransition` unless completed.
    pub fn result(&self) -> Result<QuizResult, QuizSessionError> {
        self.require(QuizState::Completed, QuizAction::Result)?;
        Ok(QuizResult::new(self.score, self.questions.len()))
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("quiz_id", &self.quiz_id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("score", &self.score)
            .field("answers_len", &self.answers.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
