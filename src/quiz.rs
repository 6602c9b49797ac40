//! Quiz manager: the in-memory question set, adaptive practice selection,
//! fair test sampling, and persistence triggering.

use crate::models::{Question, QuestionId, QuestionRecord};
use crate::selection::WeightStrategy;
use crate::storage::{QuestionStore, StoreResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::warn;

/// Selection errors. Always recoverable by the caller; selection never
/// mutates the collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no active questions available")]
    NoActiveQuestions,
    #[error("number of questions must be positive")]
    InvalidCount,
    #[error("requested {requested} questions but only {available} are active")]
    NotEnoughQuestions { requested: usize, available: usize },
}

/// Coordinates quiz logic over the whole question collection.
///
/// The collection is loaded once at construction and persisted wholesale
/// after every mutating operation.
pub struct QuizManager {
    store: Box<dyn QuestionStore>,
    strategy: Box<dyn WeightStrategy>,
    questions: Vec<Question>,
    rng: StdRng,
}

impl QuizManager {
    /// Load the question collection from the store. Records that fail
    /// validation are skipped with a warning, never fatal to the load.
    pub fn new(store: Box<dyn QuestionStore>, strategy: Box<dyn WeightStrategy>) -> StoreResult<Self> {
        Self::with_rng(store, strategy, StdRng::from_entropy())
    }

    /// Like [`QuizManager::new`] with an explicit random source, so tests
    /// can fix the seed and assert exact selection outcomes.
    pub fn with_rng(
        store: Box<dyn QuestionStore>,
        strategy: Box<dyn WeightStrategy>,
        rng: StdRng,
    ) -> StoreResult<Self> {
        let records = store.load_all()?;
        let mut questions = Vec::with_capacity(records.len());
        for record in records {
            match Question::from_record(record) {
                Ok(question) => questions.push(question),
                Err(err) => warn!(%err, "skipping invalid question record"),
            }
        }
        Ok(Self {
            store,
            strategy,
            questions,
            rng,
        })
    }

    fn persist(&self) -> StoreResult<()> {
        let records: Vec<QuestionRecord> = self.questions.iter().map(Question::to_record).collect();
        self.store.save_all(&records)
    }

    /// All known questions, in load/insertion order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Only active questions, order preserved.
    pub fn active_questions(&self) -> Vec<&Question> {
        self.questions.iter().filter(|q| q.active).collect()
    }

    /// Find a question by id. Absence is not an error.
    pub fn find(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Add a new question and persist the collection.
    pub fn add_question(&mut self, question: Question) -> StoreResult<()> {
        self.questions.push(question);
        self.persist()
    }

    /// Enable or disable a question by id. Returns `Ok(false)` without
    /// persisting when the id is unknown. Setting the current value again
    /// is not an error.
    pub fn set_active(&mut self, id: QuestionId, active: bool) -> StoreResult<bool> {
        let Some(question) = self.questions.iter_mut().find(|q| q.id == id) else {
            return Ok(false);
        };
        question.active = active;
        self.persist()?;
        Ok(true)
    }

    /// Flip a question's active flag by id, with the same contract as
    /// [`QuizManager::set_active`].
    pub fn toggle_active(&mut self, id: QuestionId) -> StoreResult<bool> {
        let Some(question) = self.questions.iter_mut().find(|q| q.id == id) else {
            return Ok(false);
        };
        question.active = !question.active;
        self.persist()?;
        Ok(true)
    }

    /// Record an answer outcome against the in-collection question with
    /// this id, then persist. Returns `Ok(false)` without persisting when
    /// the id is unknown.
    pub fn record_result(&mut self, id: QuestionId, correct: bool) -> StoreResult<bool> {
        let Some(question) = self.questions.iter_mut().find(|q| q.id == id) else {
            return Ok(false);
        };
        question.record_result(correct);
        self.persist()?;
        Ok(true)
    }

    /// Pick one active question by weighted random selection. Selection
    /// alone does not count as an attempt; each call is independent.
    pub fn select_for_practice(&mut self) -> Result<Question, SelectionError> {
        let active: Vec<&Question> = self.questions.iter().filter(|q| q.active).collect();
        if active.is_empty() {
            return Err(SelectionError::NoActiveQuestions);
        }

        let weights: Vec<f64> = active.iter().map(|q| self.strategy.weight(q.stats())).collect();
        let total: f64 = weights.iter().sum();

        // Cumulative-weight scan. Strategy weights are positive by contract,
        // so total > 0 whenever the active set is non-empty.
        let mut target = self.rng.gen_range(0.0..total);
        for (question, weight) in active.iter().zip(&weights) {
            if target < *weight {
                return Ok((*question).clone());
            }
            target -= weight;
        }
        // Floating-point rounding can leave target at the very end of the range.
        Ok(active[active.len() - 1].clone())
    }

    /// Pick `count` distinct active questions uniformly at random, without
    /// replacement and without weighting. Test mode is a fair sample.
    pub fn select_for_test(&mut self, count: usize) -> Result<Vec<Question>, SelectionError> {
        if count == 0 {
            return Err(SelectionError::InvalidCount);
        }
        let active: Vec<&Question> = self.questions.iter().filter(|q| q.active).collect();
        if count > active.len() {
            return Err(SelectionError::NotEnoughQuestions {
                requested: count,
                available: active.len(),
            });
        }

        let picks = rand::seq::index::sample(&mut self.rng, active.len(), count);
        Ok(picks.iter().map(|i| active[i].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionSource, StatsRecord};
    use crate::selection::{strategy_by_name, AccuracyWeighted};
    use crate::storage::MemoryStore;
    use std::collections::HashSet;

    fn freeform(topic: &str, text: &str) -> Question {
        Question::freeform(topic, text, QuestionSource::Manual, "reference answer").unwrap()
    }

    fn manager_with(store: MemoryStore, seed: u64) -> QuizManager {
        QuizManager::with_rng(
            Box::new(store),
            Box::new(AccuracyWeighted::default()),
            StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_add_question_persists() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store.clone(), 1);

        manager.add_question(freeform("Py", "What is a list?")).unwrap();
        assert_eq!(manager.questions().len(), 1);
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_find_and_active_filter() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store, 1);

        let question = freeform("Py", "q1");
        let id = question.id;
        manager.add_question(question).unwrap();
        manager.add_question(freeform("Py", "q2")).unwrap();

        assert!(manager.find(id).is_some());
        assert!(manager.find(uuid::Uuid::new_v4()).is_none());

        assert!(manager.set_active(id, false).unwrap());
        assert_eq!(manager.active_questions().len(), 1);
        assert_eq!(manager.questions().len(), 2);
    }

    #[test]
    fn test_set_active_unknown_id_does_not_persist() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store.clone(), 1);
        manager.add_question(freeform("Py", "q1")).unwrap();

        assert!(!manager.set_active(uuid::Uuid::new_v4(), false).unwrap());
        assert!(!manager.toggle_active(uuid::Uuid::new_v4()).unwrap());
        assert!(!manager.record_result(uuid::Uuid::new_v4(), true).unwrap());
        assert!(store.load_all().unwrap()[0].active);
    }

    #[test]
    fn test_toggle_active_flips_and_persists() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store.clone(), 1);
        let question = freeform("Py", "q1");
        let id = question.id;
        manager.add_question(question).unwrap();

        assert!(manager.toggle_active(id).unwrap());
        assert!(!manager.find(id).unwrap().active);
        assert!(!store.load_all().unwrap()[0].active);

        assert!(manager.toggle_active(id).unwrap());
        assert!(manager.find(id).unwrap().active);
    }

    #[test]
    fn test_record_result_updates_stats_and_persists() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store.clone(), 1);
        let question = freeform("Py", "q1");
        let id = question.id;
        manager.add_question(question).unwrap();

        assert!(manager.record_result(id, true).unwrap());
        assert!(manager.record_result(id, false).unwrap());

        let stats = manager.find(id).unwrap().stats();
        assert_eq!(stats.times_shown(), 2);
        assert_eq!(stats.times_correct(), 1);

        let stored = store.load_all().unwrap();
        assert_eq!(stored[0].stats.times_shown, 2);
        assert_eq!(stored[0].stats.times_correct, 1);
    }

    #[test]
    fn test_practice_fails_with_no_active_questions() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store, 1);
        assert_eq!(
            manager.select_for_practice(),
            Err(SelectionError::NoActiveQuestions)
        );

        let question = freeform("Py", "q1");
        let id = question.id;
        manager.add_question(question).unwrap();
        manager.set_active(id, false).unwrap();
        assert_eq!(
            manager.select_for_practice(),
            Err(SelectionError::NoActiveQuestions)
        );
    }

    #[test]
    fn test_practice_never_returns_inactive_question() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store, 42);

        let inactive = freeform("Py", "inactive");
        let inactive_id = inactive.id;
        manager.add_question(inactive).unwrap();
        manager.add_question(freeform("Py", "active-1")).unwrap();
        manager.add_question(freeform("Py", "active-2")).unwrap();
        manager.set_active(inactive_id, false).unwrap();

        for _ in 0..200 {
            let picked = manager.select_for_practice().unwrap();
            assert!(picked.active);
            assert_ne!(picked.id, inactive_id);
        }
    }

    #[test]
    fn test_practice_selection_does_not_mutate_stats() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store, 7);
        manager.add_question(freeform("Py", "q1")).unwrap();

        let picked = manager.select_for_practice().unwrap();
        assert_eq!(picked.stats().times_shown(), 0);
        assert_eq!(manager.find(picked.id).unwrap().stats().times_shown(), 0);
    }

    #[test]
    fn test_practice_favours_poorly_known_questions() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store, 9);

        let mastered = freeform("Py", "mastered");
        let mastered_id = mastered.id;
        let struggling = freeform("Py", "struggling");
        let struggling_id = struggling.id;
        manager.add_question(mastered).unwrap();
        manager.add_question(struggling).unwrap();

        for _ in 0..10 {
            manager.record_result(mastered_id, true).unwrap();
            manager.record_result(struggling_id, false).unwrap();
        }

        // Weights are 0.1 vs 1.0, so the struggling question should win
        // the large majority of 500 draws.
        let mut struggling_picks = 0;
        for _ in 0..500 {
            if manager.select_for_practice().unwrap().id == struggling_id {
                struggling_picks += 1;
            }
        }
        assert!(struggling_picks > 350, "picked {struggling_picks} of 500");
    }

    #[test]
    fn test_test_selection_bounds() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store, 3);
        manager.add_question(freeform("Py", "q1")).unwrap();
        manager.add_question(freeform("Py", "q2")).unwrap();

        assert_eq!(manager.select_for_test(0), Err(SelectionError::InvalidCount));
        assert_eq!(
            manager.select_for_test(3),
            Err(SelectionError::NotEnoughQuestions {
                requested: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_test_selection_distinct_and_active() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store, 5);

        let inactive = freeform("Py", "inactive");
        let inactive_id = inactive.id;
        manager.add_question(inactive).unwrap();
        for i in 0..6 {
            manager.add_question(freeform("Py", &format!("q{i}"))).unwrap();
        }
        manager.set_active(inactive_id, false).unwrap();

        for _ in 0..50 {
            let selected = manager.select_for_test(4).unwrap();
            assert_eq!(selected.len(), 4);
            let ids: HashSet<QuestionId> = selected.iter().map(|q| q.id).collect();
            assert_eq!(ids.len(), 4);
            assert!(selected.iter().all(|q| q.active));
            assert!(!ids.contains(&inactive_id));
        }
    }

    #[test]
    fn test_seeded_selection_is_deterministic() {
        let store = MemoryStore::new();
        {
            let mut seed_manager = manager_with(store.clone(), 0);
            for i in 0..5 {
                seed_manager
                    .add_question(freeform("Py", &format!("q{i}")))
                    .unwrap();
            }
        }

        let mut first = manager_with(store.clone(), 1234);
        let mut second = manager_with(store, 1234);
        for _ in 0..20 {
            assert_eq!(
                first.select_for_practice().unwrap().id,
                second.select_for_practice().unwrap().id
            );
        }
        assert_eq!(
            first.select_for_test(3).unwrap().iter().map(|q| q.id).collect::<Vec<_>>(),
            second.select_for_test(3).unwrap().iter().map(|q| q.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_miss_count_strategy_also_selects() {
        let store = MemoryStore::new();
        let mut manager = QuizManager::with_rng(
            Box::new(store),
            strategy_by_name("miss-count"),
            StdRng::seed_from_u64(11),
        )
        .unwrap();
        manager.add_question(freeform("Py", "q1")).unwrap();
        assert!(manager.select_for_practice().is_ok());
    }

    #[test]
    fn test_invalid_records_skipped_on_load() {
        let store = MemoryStore::new();
        let good = freeform("Py", "good").to_record();
        let mut bad = freeform("Py", "bad").to_record();
        bad.stats = StatsRecord {
            times_shown: 1,
            times_correct: 3,
        };
        store.save_all(&[good.clone(), bad]).unwrap();

        let manager = manager_with(store, 1);
        assert_eq!(manager.questions().len(), 1);
        assert_eq!(manager.questions()[0].id, good.id);
    }

    #[test]
    fn test_end_to_end_practice_cycle() {
        let store = MemoryStore::new();
        let mut manager = manager_with(store.clone(), 2);

        let question = Question::freeform(
            "Py",
            "What is a list?",
            QuestionSource::Manual,
            "An ordered mutable collection.",
        )
        .unwrap();
        manager.add_question(question).unwrap();

        let picked = manager.select_for_practice().unwrap();
        assert!(manager.record_result(picked.id, true).unwrap());

        let reloaded = manager_with(store, 3);
        let stats = reloaded.find(picked.id).unwrap().stats();
        assert_eq!(stats.times_shown(), 1);
        assert_eq!(stats.times_correct(), 1);
        assert_eq!(stats.accuracy(), 1.0);
    }
}
