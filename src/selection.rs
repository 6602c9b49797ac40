//! Selection weighting strategies for practice mode.

use crate::models::QuestionStats;

/// Trait for practice-mode weighting strategies.
pub trait WeightStrategy: Send + Sync {
    /// Strategy name.
    fn name(&self) -> &str;

    /// Selection weight for a question with the given stats. Must be
    /// positive, maximal for unseen questions, and non-increasing as
    /// accuracy rises.
    fn weight(&self, stats: &QuestionStats) -> f64;
}

/// Accuracy-based weighting (default): unseen questions get weight 1.0,
/// seen questions get `1 - accuracy`, floored so a perfectly-answered
/// question is still eventually selectable.
pub struct AccuracyWeighted {
    /// Minimum weight for a seen question.
    pub floor: f64,
}

impl Default for AccuracyWeighted {
    fn default() -> Self {
        Self { floor: 0.1 }
    }
}

impl WeightStrategy for AccuracyWeighted {
    fn name(&self) -> &str {
        "accuracy"
    }

    fn weight(&self, stats: &QuestionStats) -> f64 {
        if stats.times_shown() == 0 {
            return 1.0;
        }
        (1.0 - stats.accuracy()).max(self.floor)
    }
}

/// Miss-count weighting: `1 + times_shown - times_correct`, so every
/// recorded miss adds a full unit of weight.
pub struct MissCountWeighted;

impl WeightStrategy for MissCountWeighted {
    fn name(&self) -> &str {
        "miss-count"
    }

    fn weight(&self, stats: &QuestionStats) -> f64 {
        1.0 + f64::from(stats.times_shown() - stats.times_correct())
    }
}

/// Get strategy by name. Unknown names fall back to the default.
pub fn strategy_by_name(name: &str) -> Box<dyn WeightStrategy> {
    match name.to_lowercase().as_str() {
        "miss-count" => Box::new(MissCountWeighted),
        _ => Box::new(AccuracyWeighted::default()),
    }
}
