//! Property tests for window checks, selection diffs and the slot lock rule.

use std::collections::BTreeSet;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use recruitment::workflows::recruitment::slots::can_mutate;
use recruitment::workflows::recruitment::window::{in_active_window, in_submission_window};
use recruitment::workflows::recruitment::{
    diff_selection, ApplicationId, InMemoryRecruitmentRepository, InterviewId,
    RecruitmentRepository, RepositoryError, WindowError,
};

fn ids(raw: &[u8]) -> Vec<InterviewId> {
    raw.iter().map(|id| InterviewId::new(format!("int-{id}"))).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: submission is open exactly on `beginning..=deadline`, and each refusal
    /// names the boundary that was crossed.
    #[test]
    fn property_submission_window_is_inclusive(
        to_deadline in 0i64..1_000,
        to_end in 0i64..1_000,
        probe in -500i64..2_500,
    ) {
        let beginning = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).single().expect("valid");
        let deadline = beginning + Duration::minutes(to_deadline);
        let end = deadline + Duration::minutes(to_end);
        let now = beginning + Duration::minutes(probe);

        match in_submission_window(beginning, deadline, end, now) {
            Ok(()) => prop_assert!(beginning <= now && now <= deadline),
            Err(WindowError::TooEarly { .. }) => prop_assert!(now < beginning),
            Err(WindowError::DeadlinePassed { .. }) => {
                prop_assert!(deadline < now && now <= end)
            }
            Err(WindowError::CycleEnded { .. }) => prop_assert!(now > end),
        }

        match in_active_window(beginning, end, now) {
            Ok(()) => prop_assert!(beginning <= now && now <= end),
            Err(WindowError::TooEarly { .. }) => prop_assert!(now < beginning),
            Err(WindowError::CycleEnded { .. }) => prop_assert!(now > end),
            Err(other) => prop_assert!(false, "unexpected {other:?}"),
        }
    }

    /// PROPERTY: applying a diff to the previous selection yields the requested one.
    #[test]
    fn property_selection_diff_rebuilds_the_request(
        previous in proptest::collection::vec(0u8..16, 0..12),
        requested in proptest::collection::vec(0u8..16, 0..12),
    ) {
        let previous = ids(&previous);
        let requested = ids(&requested);
        let diff = diff_selection(&previous, &requested);

        let before: BTreeSet<&InterviewId> = previous.iter().collect();
        let after: BTreeSet<&InterviewId> = requested.iter().collect();

        prop_assert!(diff.to_add.iter().all(|id| !before.contains(id) && after.contains(id)));
        prop_assert!(diff.to_del.iter().all(|id| before.contains(id) && !after.contains(id)));

        let mut rebuilt: BTreeSet<&InterviewId> = before.clone();
        rebuilt.retain(|id| !diff.to_del.contains(id));
        rebuilt.extend(diff.to_add.iter());
        prop_assert_eq!(rebuilt, after);

        let unique_adds: BTreeSet<&InterviewId> = diff.to_add.iter().collect();
        prop_assert_eq!(unique_adds.len(), diff.to_add.len());
    }

    /// PROPERTY: a slot is mutable exactly when no selection references it.
    #[test]
    fn property_selection_locks_exactly_the_selected_slots(
        selected in proptest::collection::btree_set(0u8..8, 0..8),
    ) {
        let repository = InMemoryRecruitmentRepository::new();
        let application = ApplicationId::new("app-prop");
        let selected_ids = ids(&selected.iter().copied().collect::<Vec<_>>());

        let verdicts = repository
            .transaction(|tx| {
                tx.add_selections(&application, &selected_ids)?;
                (0u8..8)
                    .map(|id| {
                        let interview = InterviewId::new(format!("int-{id}"));
                        Ok((id, can_mutate(&*tx, &interview)?))
                    })
                    .collect::<Result<Vec<_>, RepositoryError>>()
            })
            .expect("transaction commits");

        for (id, mutable) in verdicts {
            prop_assert_eq!(mutable, !selected.contains(&id));
        }

        let released = repository
            .transaction(|tx| {
                tx.clear_selections(&application, &selected_ids)?;
                selected_ids
                    .iter()
                    .map(|interview| can_mutate(&*tx, interview))
                    .collect::<Result<Vec<_>, RepositoryError>>()
            })
            .expect("transaction commits");
        prop_assert!(released.into_iter().all(|mutable| mutable));
    }
}
