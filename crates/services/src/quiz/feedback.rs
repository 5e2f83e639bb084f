use learn_core::model::QuestionId;

/// What the presentation layer needs right after an answer: the verdict,
/// both indices to highlight, and the explanation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub selected_index: usize,
    pub correct_index: usize,
    pub was_correct: bool,
    pub explanation: String,
}

/// Aggregated view of quiz progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
}

/// Final tally of a completed quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizResult {
    pub score: usize,
    pub total: usize,
    /// `100 * score / total`, rounded half-up.
    pub percentage: u8,
}

impl QuizResult {
    /// # Panics
    ///
    /// Panics in debug builds if `total` is zero or `score > total`.
    #[must_use]
    pub fn new(score: usize, total: usize) -> Self {
        debug_assert!(total > 0 && score <= total);
        let percentage = if total == 0 {
            0
        } else {
            // Integer form of round(100 * score / total) with halves rounded up.
            let rounded = (200 * score + total) / (2 * total);
            u8::try_from(rounded.min(100)).unwrap_or(100)
        };
        Self {
            score,
            total,
            percentage,
        }
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        Verdict::from_percentage(self.percentage)
    }
}

/// Coarse rating shown with the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Excellent,
    Good,
    KeepPracticing,
}

impl Verdict {
    #[must_use]
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            70.. => Verdict::Excellent,
            50..=69 => Verdict::Good,
            _ => Verdict::KeepPracticing,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Verdict::Excellent => "Excellent work!",
            Verdict::Good => "Good job!",
            Verdict::KeepPracticing => "Keep practicing!",
        }
    }

    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            Verdict::Excellent => "🎉",
            Verdict::Good => "👍",
            Verdict::KeepPracticing => "💪",
        }
    }
}
