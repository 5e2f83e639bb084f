use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::{QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least two options, got {len}")]
    TooFewOptions { len: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct index {index} is outside the {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("a quiz needs at least one question")]
    Empty,

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Any index other than the correct one is wrong, including indices past
    /// the last option.
    #[must_use]
    pub fn is_correct(&self, selected_index: usize) -> bool {
        selected_index == self.correct_index
    }
}

/// Unvalidated question input, typically built from page content.
#[derive(Debug, Clone, Default)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}

impl QuestionDraft {
    /// Validate and normalize the draft into a `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, there are fewer than two
    /// options, an option is blank, or `correct_index` does not point at an option.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let options: Vec<String> = self.options.iter().map(|o| o.trim().to_owned()).collect();
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions { len: options.len() });
        }
        if let Some(index) = options.iter().position(String::is_empty) {
            return Err(QuestionError::EmptyOption { index });
        }
        if self.correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: self.correct_index,
                len: options.len(),
            });
        }

        Ok(Question {
            id: self.id,
            prompt,
            options,
            correct_index: self.correct_index,
            explanation: self.explanation.trim().to_owned(),
        })
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// An ordered, non-empty set of questions under a quiz id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    questions: Vec<Question>,
}

impl Quiz {
    /// # Errors
    ///
    /// Returns `QuizError::Empty` for an empty question list and
    /// `QuizError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuizError::DuplicateQuestion(question.id()));
            }
        }
        Ok(Self {
            id,
            title: title.into(),
            questions,
        })
    }

    /// Validate every draft and assemble the quiz.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` encountered, or a `QuizError` from [`Quiz::new`].
    pub fn from_drafts(
        id: QuizId,
        title: impl Into<String>,
        drafts: Vec<QuestionDraft>,
    ) -> Result<Self, crate::Error> {
        let questions = drafts
            .into_iter()
            .map(QuestionDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(id, title, questions)?)
    }

    #[must_use]
    pub fn id(&self) -> &QuizId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Number of questions; never zero.
    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn into_parts(self) -> (QuizId, String, Vec<Question>) {
        (self.id, self.title, self.questions)
    }
}

/// The built-in Python basics quiz shown on the quiz page.
///
/// # Errors
///
/// Returns `crate::Error` only if the bundled content fails validation.
pub fn sample_quiz() -> Result<Quiz, crate::Error> {
    Quiz::from_drafts(
        QuizId::new("sample-quiz"),
        "Python Basics",
        vec![
            QuestionDraft {
                id: QuestionId::new(1),
                prompt: "How do you create a variable in Python?".into(),
                options: vec![
                    "var x = 5".into(),
                    "x = 5".into(),
                    "int x = 5".into(),
                    "create x = 5".into(),
                ],
                correct_index: 1,
                explanation: "Simple assignment: x = 5".into(),
            },
            QuestionDraft {
                id: QuestionId::new(2),
                prompt: "Which function prints text?".into(),
                options: vec![
                    "display()".into(),
                    "print()".into(),
                    "output()".into(),
                    "show()".into(),
                ],
                correct_index: 1,
                explanation: "print() shows output.".into(),
            },
        ],
    )
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: u64, correct_index: usize) -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new(id),
            prompt: format!("Q{id}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_index,
            explanation: "because".into(),
        }
    }

    #[test]
    fn draft_validation_trims_text() {
        let mut d = draft(1, 2);
        d.prompt = "  What?  ".into();
        d.options[0] = " a ".into();
        let q = d.validate().unwrap();
        assert_eq!(q.prompt(), "What?");
        assert_eq!(q.options()[0], "a");
        assert!(q.is_correct(2));
        assert!(!q.is_correct(99));
    }

    #[test]
    fn draft_rejects_bad_shapes() {
        let mut blank = draft(1, 0);
        blank.prompt = "   ".into();
        assert_eq!(blank.validate().unwrap_err(), QuestionError::EmptyPrompt);

        let mut one_option = draft(1, 0);
        one_option.options.truncate(1);
        assert_eq!(
            one_option.validate().unwrap_err(),
            QuestionError::TooFewOptions { len: 1 }
        );

        let mut empty_option = draft(1, 0);
        empty_option.options[1] = " ".into();
        assert_eq!(
            empty_option.validate().unwrap_err(),
            QuestionError::EmptyOption { index: 1 }
        );

        assert_eq!(
            draft(1, 3).validate().unwrap_err(),
            QuestionError::CorrectIndexOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn quiz_requires_questions() {
        let err = Quiz::new(QuizId::new("q"), "Empty", Vec::new()).unwrap_err();
        assert_eq!(err, QuizError::Empty);
    }

    #[test]
    fn quiz_rejects_duplicate_question_ids() {
        let err = Quiz::from_drafts(QuizId::new("q"), "Dup", vec![draft(4, 0), draft(4, 1)])
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Quiz(QuizError::DuplicateQuestion(id)) if id == QuestionId::new(4)
        ));
    }

    #[test]
    fn sample_quiz_is_valid() {
        let quiz = sample_quiz().unwrap();
        assert_eq!(quiz.id().as_str(), "sample-quiz");
        assert_eq!(quiz.len(), 2);
        assert!(quiz.questions().iter().all(|q| q.correct_index() == 1));
    }
}
