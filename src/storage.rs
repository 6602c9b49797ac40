//! Question persistence: a load-all/save-all store trait with a JSON file
//! implementation and an in-memory implementation for tests.

use crate::models::QuestionRecord;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored data must be a JSON list of question objects")]
    InvalidFormat,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Whole-collection question storage. Saves replace all stored records.
pub trait QuestionStore {
    /// Load all stored records. "Nothing stored yet" is an empty list,
    /// not an error.
    fn load_all(&self) -> StoreResult<Vec<QuestionRecord>>;

    /// Replace all stored records.
    fn save_all(&self, records: &[QuestionRecord]) -> StoreResult<()>;
}

/// JSON file storage: one list-of-objects file, rewritten in full on save.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QuestionStore for JsonFileStore {
    fn load_all(&self) -> StoreResult<Vec<QuestionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        // A file that is not JSON at all is treated as no data rather than
        // a fatal error; the next save rewrites it.
        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "question file is not valid JSON, starting empty");
                return Ok(Vec::new());
            }
        };

        let serde_json::Value::Array(items) = value else {
            return Err(StoreError::InvalidFormat);
        };

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            if !item.is_object() {
                warn!("skipping non-object question entry");
                continue;
            }
            match serde_json::from_value::<QuestionRecord>(item) {
                Ok(record) => records.push(record),
                Err(err) => warn!(%err, "skipping malformed question entry"),
            }
        }
        Ok(records)
    }

    fn save_all(&self, records: &[QuestionRecord]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, payload)?;
        Ok(())
    }
}

/// In-memory storage for tests. Clones share the same underlying records,
/// so a second manager over a clone sees what the first one saved.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<QuestionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuestionStore for MemoryStore {
    fn load_all(&self) -> StoreResult<Vec<QuestionRecord>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.clone())
    }

    fn save_all(&self, records: &[QuestionRecord]) -> StoreResult<()> {
        let mut stored = self.records.lock().unwrap_or_else(|e| e.into_inner());
        *stored = records.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Question, QuestionSource};

    fn sample_records() -> Vec<QuestionRecord> {
        vec![
            Question::freeform("Py", "What is a list?", QuestionSource::Manual, "An ordered mutable collection.")
                .unwrap()
                .to_record(),
            Question::multiple_choice(
                "Py",
                "Which of these is immutable?",
                QuestionSource::Llm,
                vec!["list".into(), "tuple".into(), "dict".into()],
                1,
            )
            .unwrap()
            .to_record(),
        ]
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("questions.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("questions.json"));
        let records = sample_records();

        store.save_all(&records).unwrap();
        assert_eq!(store.load_all().unwrap(), records);
    }

    #[test]
    fn test_save_load_save_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        let store = JsonFileStore::new(&path);

        store.save_all(&sample_records()).unwrap();
        let first = fs::read(&path).unwrap();

        let reloaded = store.load_all().unwrap();
        store.save_all(&reloaded).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/deeper/questions.json"));
        store.save_all(&sample_records()).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_garbage_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        fs::write(&path, "not json at all {{{").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_non_list_root_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        fs::write(&path, r#"{"id": "not-a-list"}"#).unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load_all(), Err(StoreError::InvalidFormat)));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        let good = serde_json::to_value(&sample_records()[0]).unwrap();
        let payload = serde_json::json!([good, {"id": "bogus"}, 42]);
        fs::write(&path, serde_json::to_string(&payload).unwrap()).unwrap();

        let store = JsonFileStore::new(&path);
        let records = store.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "Py");
    }

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryStore::new();
        let handle = store.clone();

        store.save_all(&sample_records()).unwrap();
        assert_eq!(handle.load_all().unwrap().len(), 2);
    }
}
