use std::collections::BTreeSet;

use super::super::domain::{Interview, InterviewId, InterviewKind, SlotFields};
use super::super::errors::StateConflict;
use super::super::repository::{RepositoryError, RepositoryTransaction};
use super::SlotError;

/// Slots referenced by a selection row, a group allocation or a team allocation. Loaded inside
/// the transaction that is about to write, so the answer cannot go stale before the commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotLocks {
    locked: BTreeSet<InterviewId>,
}

impl SlotLocks {
    pub fn load(
        tx: &dyn RepositoryTransaction,
        candidates: &[InterviewId],
    ) -> Result<Self, RepositoryError> {
        let mut locked: BTreeSet<InterviewId> =
            tx.selected_among(candidates)?.into_iter().collect();
        locked.extend(tx.allocated_among(InterviewKind::Group, candidates)?);
        locked.extend(tx.allocated_among(InterviewKind::Team, candidates)?);
        Ok(Self { locked })
    }

    pub fn can_mutate(&self, id: &InterviewId) -> bool {
        !self.locked.contains(id)
    }

    pub fn locked(&self) -> impl Iterator<Item = &InterviewId> {
        self.locked.iter()
    }
}

pub fn can_mutate(tx: &dyn RepositoryTransaction, id: &InterviewId) -> Result<bool, RepositoryError> {
    let locks = SlotLocks::load(tx, std::slice::from_ref(id))?;
    Ok(locks.can_mutate(id))
}

/// Rewrites the timing of a slot. Identical fields are accepted as a no-op even when the slot
/// is locked.
pub fn update_interview(
    tx: &mut dyn RepositoryTransaction,
    id: &InterviewId,
    fields: SlotFields,
) -> Result<Interview, SlotError> {
    fields.validate()?;
    let mut interview = tx.interview(id)?.ok_or(RepositoryError::NotFound)?;
    if interview.slot == fields {
        return Ok(interview);
    }
    if !can_mutate(&*tx, id)? {
        return Err(StateConflict::SlotLocked {
            interview: id.clone(),
        }
        .into());
    }
    interview.slot = fields;
    tx.update_interview(interview.clone())?;
    Ok(interview)
}

pub fn delete_interview(tx: &mut dyn RepositoryTransaction, id: &InterviewId) -> Result<(), SlotError> {
    if tx.interview(id)?.is_none() {
        return Err(RepositoryError::NotFound.into());
    }
    if !can_mutate(&*tx, id)? {
        return Err(StateConflict::SlotLocked {
            interview: id.clone(),
        }
        .into());
    }
    tx.delete_interview(id)?;
    Ok(())
}
