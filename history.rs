use crate::ids;
use crate::models::{NewPromptHistoryEntry, PromptHistoryEntry};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, VecSkipError};

/// Default number of AI interactions kept in the log.
pub const HISTORY_CAPACITY: usize = 100;

/// Newest-first log of AI recognition round trips. Bounded: inserting past
/// the capacity silently drops the oldest entries.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptHistory {
    #[serde_as(as = "VecSkipError<_>")]
    entries: Vec<PromptHistoryEntry>,
}

impl PromptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps `entry` with an id and the current time, puts it at the front
    /// and truncates to `capacity`.
    pub fn record(&mut self, entry: NewPromptHistoryEntry, capacity: usize) -> PromptHistoryEntry {
        let stored = PromptHistoryEntry {
            id: ids::new_id(),
            timestamp: ids::now_millis(),
            prompt: entry.prompt,
            model: entry.model.as_str().to_string(),
            kind: entry.kind,
            response_summary: entry.response_summary,
        };
        self.entries.insert(0, stored.clone());
        self.enforce_capacity(capacity);
        stored
    }

    pub fn enforce_capacity(&mut self, capacity: usize) {
        if self.entries.len() > capacity {
            log::debug!(
                "Prompt history over capacity ({} > {capacity}); dropping oldest",
                self.entries.len()
            );
            self.entries.truncate(capacity);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[PromptHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
