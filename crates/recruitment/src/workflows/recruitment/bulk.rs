//! Typed results for best-effort bulk operations. Partial failure is data, not an error.

use serde::Serialize;

use super::domain::InterviewId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure<K> {
    pub id: K,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome<T, K> {
    pub succeeded: Vec<T>,
    pub failed: Vec<ItemFailure<K>>,
}

impl<T, K> Default for BulkOutcome<T, K> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T, K> BulkOutcome<T, K> {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn fail(&mut self, id: K, reason: impl ToString) {
        self.failed.push(ItemFailure {
            id,
            reason: reason.to_string(),
        });
    }
}

/// Identifies an item of a slot batch: an existing slot, or the position of a new one in the
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRef {
    Existing(InterviewId),
    New { position: usize },
}

/// Per-item report of a slot batch (create, delete or reconcile).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotReport {
    pub created: Vec<InterviewId>,
    pub updated: Vec<InterviewId>,
    pub deleted: Vec<InterviewId>,
    pub failed: Vec<ItemFailure<SlotRef>>,
}

impl SlotReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn fail(&mut self, slot: SlotRef, reason: impl ToString) {
        self.failed.push(ItemFailure {
            id: slot,
            reason: reason.to_string(),
        });
    }
}
