//! Local mirror of the remote collection
//!
//! Only confirmed server outcomes are applied here. Every applied mutation
//! bumps `version`, which the controller uses to detect loads that were
//! requested before a later write was confirmed.

use crate::record::{Record, RecordId};

/// Ordered in-memory copy of the remote collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalListState {
    records: Vec<Record>,
    version: u64,
}

impl LocalListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.iter().any(|r| &r.id == id)
    }

    /// Install a freshly loaded sequence, discarding the old one
    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records = records;
        self.version += 1;
    }

    /// Append a record confirmed by a create
    pub fn append(&mut self, record: Record) {
        self.records.push(record);
        self.version += 1;
    }

    /// Excise every record with `id`, keeping the order of the rest
    ///
    /// Returns how many records were dropped.
    pub fn remove_id(&mut self, id: &RecordId) -> usize {
        let before = self.records.len();
        self.records.retain(|r| &r.id != id);
        let removed = before - self.records.len();
        if removed > 0 {
            self.version += 1;
        }
        removed
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.records.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LocalListState {
        let mut state = LocalListState::new();
        state.replace_all(vec![
            Record::new(1, "Pele", "Brazil"),
            Record::new(2, "Maradona", "Argentina"),
            Record::new(3, "Cruyff", "Netherlands"),
        ]);
        state
    }

    #[test]
    fn test_starts_empty() {
        let state = LocalListState::new();
        assert!(state.is_empty());
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn test_replace_all_discards_old_records() {
        let mut state = sample();
        state.replace_all(vec![Record::new(9, "Zidane", "France")]);
        assert_eq!(state.len(), 1);
        assert!(!state.contains(&RecordId::Number(1)));
        assert_eq!(state.version(), 2);
    }

    #[test]
    fn test_append_goes_last() {
        let mut state = sample();
        state.append(Record::new(4, "Eusebio", "Portugal"));
        assert_eq!(state.records().last().unwrap().name, "Eusebio");
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut state = sample();
        assert_eq!(state.remove_id(&RecordId::Number(2)), 1);
        let names: Vec<_> = state.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Pele", "Cruyff"]);
    }

    #[test]
    fn test_remove_absent_id_keeps_version() {
        let mut state = sample();
        let version = state.version();
        assert_eq!(state.remove_id(&RecordId::Number(99)), 0);
        assert_eq!(state.version(), version);
        assert_eq!(state.len(), 3);
    }
}
