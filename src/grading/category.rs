//! Per-category averaging.

use std::collections::BTreeMap;

use crate::domain::WeightedCategory;

impl WeightedCategory {
    /// Mean of the entered scores for this category's projects.
    ///
    /// Projects without a score are left out rather than counted as zero, so
    /// partial entry does not drag the average down. Returns `None` when no
    /// project has a score yet. Scores for projects outside the category are
    /// ignored.
    pub fn average_for(&self, scores: &BTreeMap<String, f64>) -> Option<f64> {
        mean(self.projects.iter().filter_map(|p| scores.get(p).copied()))
    }

    /// Number of this category's projects that have a score.
    pub fn entered_count(&self, scores: &BTreeMap<String, f64>) -> usize {
        self.projects.iter().filter(|p| scores.contains_key(*p)).count()
    }
}

/// Arithmetic mean, or `None` for an empty sequence.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
