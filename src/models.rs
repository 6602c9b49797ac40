//! Data models for the quiz trainer.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique question identifier.
pub type QuestionId = Uuid;

/// Validation errors for question construction and record restore.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("multiple-choice question must have at least one option")]
    NoOptions,
    #[error("multiple-choice question must define a correct option index")]
    NoCorrectIndex,
    #[error("correct option index {index} is out of range for {len} options")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("freeform question must have a non-empty reference answer")]
    MissingReference,
    #[error("multiple-choice question must not carry a reference answer")]
    McqWithReference,
    #[error("freeform question must not carry options or a correct index")]
    FreeformWithOptions,
    #[error("stats are inconsistent: {correct} correct out of {shown} shown")]
    InconsistentStats { shown: u32, correct: u32 },
}

/// Question type discriminant as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Freeform,
}

impl QuestionType {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::Freeform => "freeform",
        }
    }
}

/// Where a question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Llm,
    Manual,
}

/// Tracks how often a question has been shown and answered correctly.
///
/// Invariant: `times_correct <= times_shown`. The only mutator is
/// [`QuestionStats::record_result`], which preserves it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionStats {
    times_shown: u32,
    times_correct: u32,
}

impl QuestionStats {
    /// Fresh stats for a new question.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore stats from persisted counts, rejecting inconsistent values.
    pub fn from_counts(shown: u32, correct: u32) -> Result<Self, ValidationError> {
        if correct > shown {
            return Err(ValidationError::InconsistentStats { shown, correct });
        }
        Ok(Self {
            times_shown: shown,
            times_correct: correct,
        })
    }

    /// Record one answered attempt.
    pub fn record_result(&mut self, correct: bool) {
        self.times_shown += 1;
        if correct {
            self.times_correct += 1;
        }
    }

    /// Ratio of correct answers, `0.0` if never shown.
    pub fn accuracy(&self) -> f64 {
        if self.times_shown == 0 {
            return 0.0;
        }
        f64::from(self.times_correct) / f64::from(self.times_shown)
    }

    pub fn times_shown(&self) -> u32 {
        self.times_shown
    }

    pub fn times_correct(&self) -> u32 {
        self.times_correct
    }
}

/// Type-specific question payload. Exactly one variant applies per question,
/// so a freeform question cannot carry options at the type level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionBody {
    MultipleChoice {
        options: Vec<String>,
        correct_index: usize,
    },
    Freeform {
        reference_answer: String,
    },
}

/// A single quiz question with its accumulated statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub topic: String,
    pub text: String,
    pub source: QuestionSource,
    pub active: bool,
    body: QuestionBody,
    stats: QuestionStats,
}

impl Question {
    /// Create a multiple-choice question, validating the option set.
    pub fn multiple_choice(
        topic: impl Into<String>,
        text: impl Into<String>,
        source: QuestionSource,
        options: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, ValidationError> {
        if options.is_empty() {
            return Err(ValidationError::NoOptions);
        }
        if correct_index >= options.len() {
            return Err(ValidationError::IndexOutOfRange {
                index: correct_index,
                len: options.len(),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            text: text.into(),
            source,
            active: true,
            body: QuestionBody::MultipleChoice {
                options,
                correct_index,
            },
            stats: QuestionStats::new(),
        })
    }

    /// Create a freeform question, validating the reference answer.
    pub fn freeform(
        topic: impl Into<String>,
        text: impl Into<String>,
        source: QuestionSource,
        reference_answer: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let reference_answer = reference_answer.into();
        if reference_answer.trim().is_empty() {
            return Err(ValidationError::MissingReference);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            text: text.into(),
            source,
            active: true,
            body: QuestionBody::Freeform { reference_answer },
            stats: QuestionStats::new(),
        })
    }

    pub fn question_type(&self) -> QuestionType {
        match self.body {
            QuestionBody::MultipleChoice { .. } => QuestionType::Mcq,
            QuestionBody::Freeform { .. } => QuestionType::Freeform,
        }
    }

    pub fn is_multiple_choice(&self) -> bool {
        matches!(self.body, QuestionBody::MultipleChoice { .. })
    }

    pub fn is_freeform(&self) -> bool {
        matches!(self.body, QuestionBody::Freeform { .. })
    }

    pub fn body(&self) -> &QuestionBody {
        &self.body
    }

    pub fn stats(&self) -> &QuestionStats {
        &self.stats
    }

    /// Record one answered attempt against this question's stats.
    pub fn record_result(&mut self, correct: bool) {
        self.stats.record_result(correct);
    }

    /// Convert to the persisted record shape.
    pub fn to_record(&self) -> QuestionRecord {
        let (question_type, options, correct_option_index, reference_answer) = match &self.body {
            QuestionBody::MultipleChoice {
                options,
                correct_index,
            } => (QuestionType::Mcq, options.clone(), Some(*correct_index), None),
            QuestionBody::Freeform { reference_answer } => (
                QuestionType::Freeform,
                Vec::new(),
                None,
                Some(reference_answer.clone()),
            ),
        };
        QuestionRecord {
            id: self.id,
            topic: self.topic.clone(),
            text: self.text.clone(),
            question_type,
            source: self.source,
            active: self.active,
            options,
            correct_option_index,
            reference_answer,
            stats: StatsRecord {
                times_shown: self.stats.times_shown(),
                times_correct: self.stats.times_correct(),
            },
        }
    }

    /// Restore a question from a persisted record, re-running all
    /// construction invariants plus the cross-payload checks the flat
    /// record shape makes representable.
    pub fn from_record(record: QuestionRecord) -> Result<Self, ValidationError> {
        let stats = QuestionStats::from_counts(record.stats.times_shown, record.stats.times_correct)?;

        let body = match record.question_type {
            QuestionType::Mcq => {
                if record.reference_answer.is_some() {
                    return Err(ValidationError::McqWithReference);
                }
                if record.options.is_empty() {
                    return Err(ValidationError::NoOptions);
                }
                let correct_index = record
                    .correct_option_index
                    .ok_or(ValidationError::NoCorrectIndex)?;
                if correct_index >= record.options.len() {
                    return Err(ValidationError::IndexOutOfRange {
                        index: correct_index,
                        len: record.options.len(),
                    });
                }
                QuestionBody::MultipleChoice {
                    options: record.options,
                    correct_index,
                }
            }
            QuestionType::Freeform => {
                if !record.options.is_empty() || record.correct_option_index.is_some() {
                    return Err(ValidationError::FreeformWithOptions);
                }
                let reference_answer = record
                    .reference_answer
                    .ok_or(ValidationError::MissingReference)?;
                if reference_answer.trim().is_empty() {
                    return Err(ValidationError::MissingReference);
                }
                QuestionBody::Freeform { reference_answer }
            }
        };

        Ok(Self {
            id: record.id,
            topic: record.topic,
            text: record.text,
            source: record.source,
            active: record.active,
            body,
            stats,
        })
    }
}

/// Persisted stats counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub times_shown: u32,
    pub times_correct: u32,
}

/// The persisted question shape: one JSON object per question, stored as a
/// list-of-objects file. Field order follows declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub topic: String,
    pub text: String,
    pub question_type: QuestionType,
    pub source: QuestionSource,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_option_index: Option<usize>,
    pub reference_answer: Option<String>,
    #[serde(default)]
    pub stats: StatsRecord,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mcq() -> Question {
        Question::multiple_choice(
            "Rust",
            "Which keyword declares an immutable binding?",
            QuestionSource::Manual,
            vec!["let".into(), "mut".into(), "static".into()],
            0,
        )
        .unwrap()
    }

    fn sample_freeform() -> Question {
        Question::freeform(
            "Py",
            "What is a list?",
            QuestionSource::Llm,
            "An ordered mutable collection.",
        )
        .unwrap()
    }

    #[test]
    fn test_stats_monotonicity() {
        let mut stats = QuestionStats::new();
        assert_eq!(stats.accuracy(), 0.0);

        for (i, correct) in [true, false, true, true, false].iter().enumerate() {
            stats.record_result(*correct);
            assert_eq!(stats.times_shown(), i as u32 + 1);
            assert!(stats.times_correct() <= stats.times_shown());
        }
        assert_eq!(stats.times_correct(), 3);
        assert!((stats.accuracy() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_stats_restore_rejects_inconsistent_counts() {
        assert_eq!(
            QuestionStats::from_counts(2, 5),
            Err(ValidationError::InconsistentStats {
                shown: 2,
                correct: 5
            })
        );
        let stats = QuestionStats::from_counts(5, 2).unwrap();
        assert_eq!(stats.times_shown(), 5);
        assert_eq!(stats.times_correct(), 2);
    }

    #[test]
    fn test_mcq_validation() {
        assert_eq!(
            Question::multiple_choice("t", "q", QuestionSource::Manual, vec![], 0),
            Err(ValidationError::NoOptions)
        );
        assert_eq!(
            Question::multiple_choice("t", "q", QuestionSource::Manual, vec!["a".into()], 1),
            Err(ValidationError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert!(sample_mcq().is_multiple_choice());
    }

    #[test]
    fn test_freeform_validation() {
        assert_eq!(
            Question::freeform("t", "q", QuestionSource::Manual, "  "),
            Err(ValidationError::MissingReference)
        );
        assert!(sample_freeform().is_freeform());
    }

    #[test]
    fn test_record_round_trip_mcq() {
        let question = sample_mcq();
        let restored = Question::from_record(question.to_record()).unwrap();
        assert_eq!(question, restored);
    }

    #[test]
    fn test_record_round_trip_freeform() {
        let mut question = sample_freeform();
        question.record_result(true);
        question.active = false;
        let restored = Question::from_record(question.to_record()).unwrap();
        assert_eq!(question, restored);
    }

    #[test]
    fn test_record_rejects_cross_payload_fields() {
        let mut record = sample_mcq().to_record();
        record.reference_answer = Some("sneaky".into());
        assert_eq!(
            Question::from_record(record),
            Err(ValidationError::McqWithReference)
        );

        let mut record = sample_freeform().to_record();
        record.options = vec!["a".into()];
        assert_eq!(
            Question::from_record(record),
            Err(ValidationError::FreeformWithOptions)
        );

        let mut record = sample_freeform().to_record();
        record.correct_option_index = Some(0);
        assert_eq!(
            Question::from_record(record),
            Err(ValidationError::FreeformWithOptions)
        );
    }

    #[test]
    fn test_record_rejects_missing_mcq_fields() {
        let mut record = sample_mcq().to_record();
        record.options.clear();
        assert_eq!(Question::from_record(record), Err(ValidationError::NoOptions));

        let mut record = sample_mcq().to_record();
        record.correct_option_index = None;
        assert_eq!(
            Question::from_record(record),
            Err(ValidationError::NoCorrectIndex)
        );

        let mut record = sample_mcq().to_record();
        record.correct_option_index = Some(17);
        assert_eq!(
            Question::from_record(record),
            Err(ValidationError::IndexOutOfRange { index: 17, len: 3 })
        );
    }

    #[test]
    fn test_record_rejects_inconsistent_stats() {
        let mut record = sample_freeform().to_record();
        record.stats = StatsRecord {
            times_shown: 1,
            times_correct: 2,
        };
        assert_eq!(
            Question::from_record(record),
            Err(ValidationError::InconsistentStats {
                shown: 1,
                correct: 2
            })
        );
    }

    #[test]
    fn test_record_defaults_on_load() {
        let json = r#"{
            "id": "9f6f46a2-9f30-4e66-9f0e-0f6a8a2d9d11",
            "topic": "Py",
            "text": "What is a list?",
            "question_type": "freeform",
            "source": "manual",
            "correct_option_index": null,
            "reference_answer": "An ordered mutable collection."
        }"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        assert!(record.active);
        assert!(record.options.is_empty());
        assert_eq!(record.stats, StatsRecord::default());

        let question = Question::from_record(record).unwrap();
        assert!(question.active);
        assert_eq!(question.stats().times_shown(), 0);
    }
}
