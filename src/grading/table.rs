//! Sparse grade storage.
//!
//! Only entered scores are stored. An absent key means "not yet entered",
//! which is different from a recorded zero.

use std::collections::BTreeMap;

use crate::domain::{CategoryId, GradeKey, Roster};
use crate::error::EntryError;
use crate::grading::ValidatedConfig;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeTable {
    entries: BTreeMap<GradeKey, f64>,
}

impl GradeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `key` and `value` against the configuration and roster, then store.
    ///
    /// Returns the previous score at `key`, if any. A rejected score leaves the
    /// table unchanged.
    pub fn record(
        &mut self,
        config: &ValidatedConfig,
        roster: &Roster,
        key: GradeKey,
        value: f64,
    ) -> Result<Option<f64>, EntryError> {
        check_key(config, roster, &key)?;
        let value = config.scale.validate_score(value)?;
        Ok(self.entries.insert(key, value))
    }

    /// Remove a score, returning it to the "not yet entered" state.
    pub fn clear(&mut self, key: &GradeKey) -> Option<f64> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &GradeKey) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GradeKey, f64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    /// Scores entered for one student, period and category, keyed by project.
    pub fn category_scores(&self, student: &str, period: &str, category: CategoryId) -> BTreeMap<String, f64> {
        let start = GradeKey::new(student, period, category, "");
        self.entries
            .range(start..)
            .take_while(|(k, _)| k.student == student && k.period == period && k.category == category)
            .map(|(k, v)| (k.project.clone(), *v))
            .collect()
    }

    /// Copy every score from `other`, overwriting on conflicts.
    pub fn merge(&mut self, other: GradeTable) {
        self.entries.extend(other.entries);
    }

    /// Drop scores that no longer fit the configuration or roster, e.g. after
    /// the roster was re-imported or a project renamed. Returns how many were
    /// removed.
    pub fn prune(&mut self, config: &ValidatedConfig, roster: &Roster) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, value| {
            check_key(config, roster, key).is_ok() && config.scale.validate_score(*value).is_ok()
        });
        before - self.entries.len()
    }
}

fn check_key(config: &ValidatedConfig, roster: &Roster, key: &GradeKey) -> Result<(), EntryError> {
    if !roster.contains(&key.student) {
        return Err(EntryError::UnknownStudent(key.student.clone()));
    }
    if !config.has_period(&key.period) {
        return Err(EntryError::UnknownPeriod(key.period.clone()));
    }
    if !config.category(key.category).has_project(&key.project) {
        return Err(EntryError::UnknownProject {
            category: key.category,
            project: key.project.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatrixConfig, WeightedCategory};

    fn setup() -> (ValidatedConfig, Roster) {
        let config = MatrixConfig {
            set_a: WeightedCategory::new("Set A", 0.7, &["P1", "P2"]),
            set_b: WeightedCategory::new("Set B", 0.3, &["Q1"]),
            trimesters: vec!["T1".into(), "T2".into()],
            ..MatrixConfig::default()
        };
        (config.into_validated().unwrap(), Roster::new(["Alice", "Bob"]))
    }

    #[test]
    fn record_and_read_back() {
        let (config, roster) = setup();
        let mut table = GradeTable::new();
        let key = GradeKey::new("Alice", "T1", CategoryId::A, "P1");

        assert_eq!(table.record(&config, &roster, key.clone(), 80.0), Ok(None));
        assert_eq!(table.record(&config, &roster, key.clone(), 85.0), Ok(Some(80.0)));
        assert_eq!(table.get(&key), Some(85.0));
        assert_eq!(table.clear(&key), Some(85.0));
        assert!(table.is_empty());
    }

    #[test]
    fn out_of_range_never_enters_the_table() {
        let (config, roster) = setup();
        let mut table = GradeTable::new();
        let key = GradeKey::new("Alice", "T1", CategoryId::A, "P1");

        let err = table.record(&config, &roster, key.clone(), 101.0).unwrap_err();
        assert!(matches!(err, EntryError::OutOfRange { .. }));
        assert_eq!(table.get(&key), None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (config, roster) = setup();
        let mut table = GradeTable::new();

        let err = table
            .record(&config, &roster, GradeKey::new("Zed", "T1", CategoryId::A, "P1"), 50.0)
            .unwrap_err();
        assert_eq!(err, EntryError::UnknownStudent("Zed".into()));

        let err = table
            .record(&config, &roster, GradeKey::new("Alice", "T9", CategoryId::A, "P1"), 50.0)
            .unwrap_err();
        assert_eq!(err, EntryError::UnknownPeriod("T9".into()));

        // Q1 belongs to Set B, not Set A.
        let err = table
            .record(&config, &roster, GradeKey::new("Alice", "T1", CategoryId::A, "Q1"), 50.0)
            .unwrap_err();
        assert!(matches!(err, EntryError::UnknownProject { category: CategoryId::A, .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn category_scores_are_scoped() {
        let (config, roster) = setup();
        let mut table = GradeTable::new();
        for (student, period, cat, project, value) in [
            ("Alice", "T1", CategoryId::A, "P1", 80.0),
            ("Alice", "T1", CategoryId::A, "P2", 90.0),
            ("Alice", "T1", CategoryId::B, "Q1", 70.0),
            ("Alice", "T2", CategoryId::A, "P1", 10.0),
            ("Bob", "T1", CategoryId::A, "P1", 20.0),
        ] {
            table
                .record(&config, &roster, GradeKey::new(student, period, cat, project), value)
                .unwrap();
        }

        let a = table.category_scores("Alice", "T1", CategoryId::A);
        assert_eq!(a.len(), 2);
        assert_eq!(a["P1"], 80.0);
        assert_eq!(a["P2"], 90.0);
        assert_eq!(table.category_scores("Alice", "T1", CategoryId::B).len(), 1);
        assert!(table.category_scores("Bob", "T2", CategoryId::A).is_empty());
    }

    #[test]
    fn prune_drops_departed_students() {
        let (config, roster) = setup();
        let mut table = GradeTable::new();
        table
            .record(&config, &roster, GradeKey::new("Alice", "T1", CategoryId::A, "P1"), 80.0)
            .unwrap();
        table
            .record(&config, &roster, GradeKey::new("Bob", "T1", CategoryId::A, "P1"), 70.0)
            .unwrap();

        let reimported = Roster::new(["Alice", "Carol"]);
        assert_eq!(table.prune(&config, &reimported), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn merge_overwrites() {
        let (config, roster) = setup();
        let key = GradeKey::new("Alice", "T1", CategoryId::A, "P1");
        let mut first = GradeTable::new();
        first.record(&config, &roster, key.clone(), 60.0).unwrap();
        let mut second = GradeTable::new();
        second.record(&config, &roster, key.clone(), 65.0).unwrap();

        first.merge(second);
        assert_eq!(first.get(&key), Some(65.0));
    }
}
