mod ids;
mod progress;
mod question;

pub use ids::{AchievementId, LessonId, ParseIdError, ProjectId, QuestionId, QuizId};

pub use progress::{LessonProgress, ProgressRecord, QuizScore};
pub use question::{Question, QuestionDraft, QuestionError, Quiz, QuizError, sample_quiz};
