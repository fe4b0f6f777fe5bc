//! Batch slot edits. Every item runs in its own transaction, so one locked or colliding slot
//! never blocks the rest; the returned [`SlotReport`] says what happened to each item.

use std::collections::HashSet;

use tracing::warn;

use super::super::bulk::{SlotRef, SlotReport};
use super::super::domain::{DesiredSlot, Group, Interview, InterviewId, RecruitmentId, SlotFields};
use super::super::repository::{RecruitmentRepository, RepositoryError, RepositoryTransaction};
use super::conflict::{delete_interview, update_interview};
use super::SlotError;

/// Brings the `name` slots of a recruitment in line with `desired`: slots missing from the
/// list are deleted, listed ids are updated, and entries without an id are created. Locked
/// slots are reported as failures and left untouched.
pub fn reconcile_interviews<R, F>(
    repository: &R,
    recruitment: &RecruitmentId,
    name: Group,
    desired: &[DesiredSlot],
    mut next_id: F,
) -> Result<SlotReport, RepositoryError>
where
    R: RecruitmentRepository,
    F: FnMut() -> InterviewId,
{
    let current: Vec<Interview> =
        repository.transaction(|tx| tx.interviews_named(recruitment, name))?;
    let current_ids: HashSet<&InterviewId> = current.iter().map(|interview| &interview.id).collect();
    let kept: HashSet<&InterviewId> = desired.iter().filter_map(|slot| slot.id.as_ref()).collect();

    let mut report = SlotReport::default();

    for stale in current.iter().filter(|interview| !kept.contains(&interview.id)) {
        match repository.transaction(|tx| delete_interview(tx, &stale.id)) {
            Ok(()) => report.deleted.push(stale.id.clone()),
            Err(error) => report.fail(SlotRef::Existing(stale.id.clone()), error),
        }
    }

    for (position, slot) in desired.iter().enumerate() {
        match &slot.id {
            Some(id) if !current_ids.contains(id) => {
                report.fail(SlotRef::Existing(id.clone()), RepositoryError::NotFound);
            }
            Some(id) => match repository.transaction(|tx| update_interview(tx, id, slot.slot)) {
                Ok(_) => report.updated.push(id.clone()),
                Err(error) => report.fail(SlotRef::Existing(id.clone()), error),
            },
            None => {
                let id = next_id();
                let created = repository
                    .transaction(|tx| insert_slot(tx, id.clone(), recruitment, name, slot.slot));
                match created {
                    Ok(()) => report.created.push(id),
                    Err(error) => report.fail(SlotRef::New { position }, error),
                }
            }
        }
    }

    log_failures(recruitment, name, &report);
    Ok(report)
}

pub fn create_interviews<R, F>(
    repository: &R,
    recruitment: &RecruitmentId,
    name: Group,
    slots: &[SlotFields],
    mut next_id: F,
) -> SlotReport
where
    R: RecruitmentRepository,
    F: FnMut() -> InterviewId,
{
    let mut report = SlotReport::default();
    for (position, fields) in slots.iter().enumerate() {
        let id = next_id();
        match repository.transaction(|tx| insert_slot(tx, id.clone(), recruitment, name, *fields)) {
            Ok(()) => report.created.push(id),
            Err(error) => report.fail(SlotRef::New { position }, error),
        }
    }
    log_failures(recruitment, name, &report);
    report
}

/// Deletes the listed slots. Ids that are not `name` slots of the recruitment fail as not
/// found.
pub fn delete_interviews<R>(
    repository: &R,
    recruitment: &RecruitmentId,
    name: Group,
    ids: &[InterviewId],
) -> SlotReport
where
    R: RecruitmentRepository,
{
    let mut report = SlotReport::default();
    for id in ids {
        let deleted = repository.transaction(|tx| {
            let owned = tx
                .interview(id)?
                .is_some_and(|interview| &interview.recruitment_id == recruitment && interview.name == name);
            if !owned {
                return Err(SlotError::from(RepositoryError::NotFound));
            }
            delete_interview(tx, id)
        });
        match deleted {
            Ok(()) => report.deleted.push(id.clone()),
            Err(error) => report.fail(SlotRef::Existing(id.clone()), error),
        }
    }
    log_failures(recruitment, name, &report);
    report
}

fn insert_slot(
    tx: &mut dyn RepositoryTransaction,
    id: InterviewId,
    recruitment: &RecruitmentId,
    name: Group,
    fields: SlotFields,
) -> Result<(), SlotError> {
    fields.validate()?;
    tx.insert_interview(Interview {
        id,
        recruitment_id: recruitment.clone(),
        name,
        slot: fields,
    })?;
    Ok(())
}

fn log_failures(recruitment: &RecruitmentId, name: Group, report: &SlotReport) {
    if !report.success() {
        warn!(
            recruitment = %recruitment,
            group = %name,
            failed = report.failed.len(),
            "slot batch finished with failures"
        );
    }
}
