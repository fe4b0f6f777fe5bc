//! Interview slots: the lock rule protecting referenced slots, candidate selection, and the
//! best-effort batch edits members run against a group's slots.

pub mod conflict;
pub mod reconcile;
pub mod selection;

use super::errors::{StateConflict, ValidationError};
use super::repository::RepositoryError;

pub use conflict::{can_mutate, delete_interview, update_interview, SlotLocks};
pub use reconcile::{create_interviews, delete_interviews, reconcile_interviews};
pub use selection::{apply_selection, diff_selection, SelectionDiff};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] StateConflict),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
