use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generated variant, success or failure text alike.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub prompt: String,
    pub content_type: String,
    pub tone: String,
    pub length: String,
    pub text: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

/// Ordered record of every generation attempt in one session.
///
/// Entries are only ever appended or dropped all at once by `clear`.
/// The selection is a copy of one entry for the detail view.
#[derive(Debug, Clone, Default)]
pub struct SessionLedger {
    entries: Vec<HistoryEntry>,
    selected: Option<HistoryEntry>,
}

impl SessionLedger {
    pub fn new() -> Self { Self::default() }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Leaves the selection alone; it only changes through select/deselect.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn list(&self) -> &[HistoryEntry] { &self.entries }

    pub fn newest_first(&self) -> impl Iterator<Item = (usize, &HistoryEntry)> {
        self.entries.iter().enumerate().rev()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> { self.entries.get(index) }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Replaces any previous selection. Origin of `entry` is not checked.
    pub fn select(&mut self, entry: HistoryEntry) {
        self.selected = Some(entry);
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&HistoryEntry> { self.selected.as_ref() }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub ledger: SessionLedger,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            ledger: SessionLedger::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self { Self::new() }
}
