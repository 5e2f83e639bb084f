//! Persisted shape of the progress record.
//!
//! The record is stored as JSON under [`PROGRESS_KEY`](crate::repository::PROGRESS_KEY)
//! with an explicit `version` tag. Payloads written before the tag existed
//! (version 0) are migrated on read; anything that cannot be understood is
//! replaced by an empty record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use learn_core::model::{
    AchievementId, LessonId, LessonProgress, ProgressRecord, ProjectId, QuizId, QuizScore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::repository::StorageError;

/// Version written by [`encode_progress`].
pub const CURRENT_VERSION: u64 = 1;

//
// ─── DOCUMENT ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressDocument {
    #[serde(default)]
    version: u64,
    lessons: BTreeMap<LessonId, LessonEntry>,
    #[serde(default)]
    quizzes: BTreeMap<QuizId, QuizEntry>,
    #[serde(default)]
    projects: BTreeMap<ProjectId, Value>,
    #[serde(default)]
    streak: u32,
    #[serde(default)]
    total_time: u64,
    #[serde(default)]
    achievements: Vec<AchievementId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonEntry {
    #[serde(default = "default_completed")]
    completed: bool,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizEntry {
    score: u8,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

fn default_completed() -> bool {
    true
}

impl ProgressDocument {
    fn from_record(record: &ProgressRecord) -> Self {
        Self {
            version: CURRENT_VERSION,
            lessons: record
                .lessons()
                .iter()
                .map(|(id, lesson)| {
                    (
                        id.clone(),
                        LessonEntry {
                            completed: lesson.completed,
                            completed_at: Some(lesson.completed_at),
                        },
                    )
                })
                .collect(),
            quizzes: record
                .quizzes()
                .iter()
                .map(|(id, quiz)| {
                    (
                        id.clone(),
                        QuizEntry {
                            score: quiz.score,
                            completed_at: Some(quiz.completed_at),
                        },
                    )
                })
                .collect(),
            projects: record.projects().clone(),
            streak: record.streak(),
            total_time: record.total_time(),
            achievements: record.achievements().to_vec(),
        }
    }

    /// Missing timestamps (only possible in hand-edited or legacy payloads)
    /// fall back to `loaded_at`.
    fn into_record(self, loaded_at: DateTime<Utc>) -> ProgressRecord {
        let lessons = self
            .lessons
            .into_iter()
            .map(|(id, entry)| {
                (
                    id,
                    LessonProgress {
                        completed: entry.completed,
                        completed_at: entry.completed_at.unwrap_or(loaded_at),
                    },
                )
            })
            .collect();
        let quizzes = self
            .quizzes
            .into_iter()
            .map(|(id, entry)| {
                (
                    id,
                    QuizScore {
                        score: entry.score,
                        completed_at: entry.completed_at.unwrap_or(loaded_at),
                    },
                )
            })
            .collect();

        ProgressRecord::from_persisted(
            lessons,
            quizzes,
            self.projects,
            self.streak,
            self.total_time,
            self.achievements,
        )
    }
}

//
// ─── DECODING ──────────────────────────────────────────────────────────────────
//

/// Why a stored payload was replaced by an empty record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreshReason {
    Absent,
    Corrupt(String),
    MissingLessons,
    UnsupportedVersion(u64),
}

/// Outcome of reading the stored progress payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Nothing usable was stored; the record is empty.
    Fresh(ProgressRecord, FreshReason),
    /// A pre-versioned payload was upgraded to the current shape.
    Migrated(ProgressRecord),
    /// The payload was already in the current shape.
    Current(ProgressRecord),
}

impl Decoded {
    /// `true` when the stored payload should be rewritten in the current shape.
    #[must_use]
    pub fn needs_persist(&self) -> bool {
        !matches!(self, Decoded::Current(_))
    }

    #[must_use]
    pub fn into_record(self) -> ProgressRecord {
        match self {
            Decoded::Fresh(record, _) | Decoded::Migrated(record) | Decoded::Current(record) => {
                record
            }
        }
    }
}

fn fresh(reason: FreshReason) -> Decoded {
    Decoded::Fresh(ProgressRecord::new(), reason)
}

/// Decode a stored progress payload, migrating older shapes.
///
/// Never fails: absent, unparsable, lesson-less or future-versioned payloads
/// all produce an empty record.
#[must_use]
pub fn decode_progress(raw: Option<&str>, loaded_at: DateTime<Utc>) -> Decoded {
    let Some(raw) = raw else {
        return fresh(FreshReason::Absent);
    };

    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => return fresh(FreshReason::Corrupt(err.to_string())),
    };
    let Some(object) = value.as_object() else {
        return fresh(FreshReason::Corrupt("payload is not an object".into()));
    };
    if !object.contains_key("lessons") {
        return fresh(FreshReason::MissingLessons);
    }

    let version = object.get("version").and_then(Value::as_u64).unwrap_or(0);
    if version > CURRENT_VERSION {
        return fresh(FreshReason::UnsupportedVersion(version));
    }

    let document: ProgressDocument = match serde_json::from_value(value) {
        Ok(document) => document,
        Err(err) => return fresh(FreshReason::Corrupt(err.to_string())),
    };
    let record = document.into_record(loaded_at);

    if version < CURRENT_VERSION {
        Decoded::Migrated(record)
    } else {
        Decoded::Current(record)
    }
}

/// Serialize a record in the current versioned shape.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if JSON encoding fails.
pub fn encode_progress(record: &ProgressRecord) -> Result<String, StorageError> {
    serde_json::to_string(&ProgressDocument::from_record(record))
        .map_err(|err| StorageError::Serialization(err.to_string()))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use learn_core::time::fixed_now;

    fn assert_empty(record: &ProgressRecord) {
        assert_eq!(record, &ProgressRecord::new());
    }

    #[test]
    fn absent_and_malformed_payloads_decode_to_empty_record() {
        let cases = [
            None,
            Some(""),
            Some("not json"),
            Some("null"),
            Some("[1, 2]"),
            Some("{}"),
            Some(r#"{"quizzes": {}}"#),
            Some(r#"{"lessons": 5}"#),
            Some(r#"{"lessons": {}, "streak": -1}"#),
        ];
        for raw in cases {
            let decoded = decode_progress(raw, fixed_now());
            assert!(
                matches!(decoded, Decoded::Fresh(..)),
                "expected fresh record for {raw:?}"
            );
            assert!(decoded.needs_persist());
            assert_empty(&decoded.into_record());
        }
    }

    #[test]
    fn legacy_payload_is_migrated() {
        let raw = r#"{
            "lessons": {"intro": {"completed": true, "completedAt": "2024-03-01T10:00:00.000Z"}},
            "quizzes": {"sample-quiz": {"score": 50, "completedAt": "2024-03-01T10:05:00.000Z"}},
            "projects": {"calculator": {"status": "started"}},
            "streak": 2,
            "totalTime": 30,
            "achievements": ["first-lesson", "first-lesson"]
        }"#;

        let decoded = decode_progress(Some(raw), fixed_now());
        assert!(matches!(decoded, Decoded::Migrated(_)));
        let record = decoded.into_record();

        assert!(record.lesson("intro").unwrap().completed);
        assert_eq!(record.quiz_score("sample-quiz").unwrap().score, 50);
        assert_eq!(
            record.projects().get("calculator"),
            Some(&serde_json::json!({"status": "started"}))
        );
        assert_eq!(record.streak(), 2);
        assert_eq!(record.total_time(), 30);
        assert_eq!(record.achievements(), &[AchievementId::new("first-lesson")]);
    }

    #[test]
    fn legacy_entries_without_timestamps_use_load_time() {
        let raw = r#"{"lessons": {"intro": {}}, "achievements": []}"#;
        let record = decode_progress(Some(raw), fixed_now()).into_record();
        let lesson = record.lesson("intro").unwrap();
        assert!(lesson.completed);
        assert_eq!(lesson.completed_at, fixed_now());
    }

    #[test]
    fn encoded_record_decodes_as_current() {
        let mut record = ProgressRecord::new();
        record.complete_lesson(LessonId::new("intro"), fixed_now());
        record.set_quiz_score(QuizId::new("sample-quiz"), 100, fixed_now() + Duration::minutes(3));
        record.unlock(AchievementId::new("first-lesson"));

        let raw = encode_progress(&record).unwrap();
        let decoded = decode_progress(Some(&raw), fixed_now() + Duration::days(1));
        assert!(!decoded.needs_persist());
        assert_eq!(decoded, Decoded::Current(record));
    }

    #[test]
    fn encoded_payload_uses_camel_case_and_version() {
        let raw = encode_progress(&ProgressRecord::new()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], CURRENT_VERSION);
        assert!(value.get("totalTime").is_some());
        assert!(value["achievements"].as_array().unwrap().is_empty());
    }

    #[test]
    fn future_version_is_not_trusted() {
        let raw = r#"{"version": 99, "lessons": {}}"#;
        let decoded = decode_progress(Some(raw), fixed_now());
        assert!(matches!(
            decoded,
            Decoded::Fresh(_, FreshReason::UnsupportedVersion(99))
        ));
    }
}
