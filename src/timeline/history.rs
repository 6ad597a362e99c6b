//! History recorder — one immutable snapshot per committed edit

use serde::{Deserialize, Serialize};

/// A full-text snapshot taken at a committed edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Complete document text after the edit
    pub value: String,
    /// Monotonic milliseconds since the session clock started
    pub time: u64,
}

impl HistoryEntry {
    pub fn new(value: impl Into<String>, time: u64) -> Self {
        Self {
            value: value.into(),
            time,
        }
    }
}

/// Append-only, ordered sequence of history entries.
///
/// Every committed edit is recorded, including ones that shrink the text:
/// replay fidelity depends on seeing each intermediate state. Timestamps are
/// expected to be non-decreasing but consumers clamp negative deltas rather
/// than trust it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a history from previously exported entries.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Append a snapshot. No deduplication, no debouncing.
    pub fn record(&mut self, value: impl Into<String>, time: u64) {
        self.entries.push(HistoryEntry::new(value, time));
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Consecutive time deltas, negative steps clamped to 0.
    pub fn deltas(&self) -> Vec<u64> {
        deltas(&self.entries)
    }

    /// Drop every entry. Only the session-wide reset may call this.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Consecutive `max(0, cur.time - prev.time)` over a slice of entries.
pub(crate) fn deltas(entries: &[HistoryEntry]) -> Vec<u64> {
    entries
        .windows(2)
        .map(|pair| pair[1].time.saturating_sub(pair[0].time))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_appends_every_edit_in_order() {
        let mut history = History::new();
        history.record("a", 0);
        history.record("ab", 40);
        history.record("ab", 41);
        history.record("a", 90);

        assert_eq!(history.len(), 4);
        let values: Vec<_> = history.entries().iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["a", "ab", "ab", "a"], "duplicates and deletions are kept");
    }

    #[test]
    fn deltas_clamp_backwards_timestamps() {
        let history = History::from_entries(vec![
            HistoryEntry::new("a", 100),
            HistoryEntry::new("ab", 50),
            HistoryEntry::new("abc", 80),
        ]);
        assert_eq!(history.deltas(), vec![0, 30]);
    }

    #[test]
    fn single_entry_has_no_deltas() {
        let mut history = History::new();
        history.record("x", 7);
        assert!(history.deltas().is_empty());
        assert_eq!(history.first(), history.last());
    }

    #[test]
    fn serializes_as_bare_entry_array() {
        let mut history = History::new();
        history.record("hi", 12);
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json, serde_json::json!([{ "value": "hi", "time": 12 }]));
    }
}
