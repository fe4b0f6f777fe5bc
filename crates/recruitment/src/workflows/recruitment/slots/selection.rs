use std::collections::HashSet;

use serde::Serialize;

use super::super::domain::{Application, InterviewId, InterviewKind};
use super::super::errors::StateConflict;
use super::super::repository::RepositoryTransaction;
use super::super::steps::ensure_mutable;
use super::SlotError;

/// Change between a stored selection and a requested one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionDiff {
    pub to_add: Vec<InterviewId>,
    pub to_del: Vec<InterviewId>,
}

impl SelectionDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_del.is_empty()
    }
}

/// `to_add = requested \ previous`, `to_del = previous \ requested`. Duplicates collapse and
/// input order is kept.
pub fn diff_selection(previous: &[InterviewId], requested: &[InterviewId]) -> SelectionDiff {
    let before: HashSet<&InterviewId> = previous.iter().collect();
    let after: HashSet<&InterviewId> = requested.iter().collect();

    SelectionDiff {
        to_add: distinct(requested.iter().filter(|id| !before.contains(id))),
        to_del: distinct(previous.iter().filter(|id| !after.contains(id))),
    }
}

fn distinct<'a>(ids: impl Iterator<Item = &'a InterviewId>) -> Vec<InterviewId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).cloned().collect()
}

/// Replaces the application's selection among the slots of `kind` with `requested`. Ids that
/// are not slots of that kind in the application's recruitment are dropped. Last writer wins;
/// there is no capacity check.
pub fn apply_selection(
    tx: &mut dyn RepositoryTransaction,
    application: &Application,
    kind: InterviewKind,
    requested: &[InterviewId],
) -> Result<SelectionDiff, SlotError> {
    ensure_mutable(application)?;
    if application.step != kind.selection_step() {
        return Err(StateConflict::SelectionClosed {
            application: application.id.clone(),
            kind,
            step: application.step,
        }
        .into());
    }

    let scope: Vec<InterviewId> = tx
        .interviews_named(&application.recruitment_id, kind.slot_name(application.group))?
        .into_iter()
        .map(|interview| interview.id)
        .collect();
    let in_scope: HashSet<&InterviewId> = scope.iter().collect();

    let wanted = distinct(requested.iter().filter(|id| in_scope.contains(id)));
    let previous: Vec<InterviewId> = tx
        .selections(&application.id)?
        .into_iter()
        .filter(|id| in_scope.contains(id))
        .collect();

    let diff = diff_selection(&previous, &wanted);
    tx.clear_selections(&application.id, &scope)?;
    tx.add_selections(&application.id, &wanted)?;
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<InterviewId> {
        raw.iter().map(|id| InterviewId::new(*id)).collect()
    }

    #[test]
    fn diff_of_identical_sets_is_empty() {
        let same = ids(&["a", "b"]);
        assert!(diff_selection(&same, &same).is_empty());
        assert!(diff_selection(&[], &[]).is_empty());
    }

    #[test]
    fn diff_splits_additions_and_removals() {
        let diff = diff_selection(&ids(&["a", "b", "c"]), &ids(&["c", "d", "d"]));
        assert_eq!(diff.to_add, ids(&["d"]));
        assert_eq!(diff.to_del, ids(&["a", "b"]));
    }
}
