//! In-memory gateway used by the service binary and the tests.
//!
//! Transactions run under one mutex against a cloned working copy which replaces the stored
//! state only when the closure succeeds, so every transaction is serialisable and failed
//! ones leave nothing behind.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::domain::{
    Application, ApplicationId, Comment, CommentId, Group, Interview, InterviewId, InterviewKind,
    Recruitment, RecruitmentId, UserId,
};
use super::repository::{
    IdentityError, IdentityResolver, RecruitmentRepository, RepositoryError,
    RepositoryTransaction, UserDetail,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    recruitments: BTreeMap<RecruitmentId, Recruitment>,
    applications: BTreeMap<ApplicationId, Application>,
    interviews: BTreeMap<InterviewId, Interview>,
    selections: BTreeSet<(ApplicationId, InterviewId)>,
    comments: BTreeMap<CommentId, Comment>,
}

#[derive(Debug, Default)]
pub struct InMemoryRecruitmentRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryRecruitmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecruitmentRepository for InMemoryRecruitmentRepository {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RepositoryTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        let mut working = guard.clone();
        let value = work(&mut working)?;
        *guard = working;
        Ok(value)
    }
}

/// Fixed user directory standing in for the identity service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: BTreeMap<UserId, UserDetail>,
}

impl InMemoryDirectory {
    pub fn new(users: impl IntoIterator<Item = UserDetail>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|user| (user.uid.clone(), user))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl IdentityResolver for InMemoryDirectory {
    fn user(&self, uid: &UserId) -> Result<UserDetail, IdentityError> {
        self.users
            .get(uid)
            .cloned()
            .ok_or_else(|| IdentityError::UnknownUser(uid.clone()))
    }
}

impl MemoryState {
    fn schedule_taken(&self, interview: &Interview) -> bool {
        self.interviews.values().any(|existing| {
            existing.id != interview.id && existing.schedule_key() == interview.schedule_key()
        })
    }
}

impl RepositoryTransaction for MemoryState {
    fn recruitment(&self, id: &RecruitmentId) -> Result<Option<Recruitment>, RepositoryError> {
        Ok(self.recruitments.get(id).cloned())
    }

    fn recruitment_by_name(&self, name: &str) -> Result<Option<Recruitment>, RepositoryError> {
        Ok(self
            .recruitments
            .values()
            .find(|recruitment| recruitment.name == name)
            .cloned())
    }

    fn recruitments(&self) -> Result<Vec<Recruitment>, RepositoryError> {
        Ok(self.recruitments.values().cloned().collect())
    }

    fn insert_recruitment(&mut self, recruitment: Recruitment) -> Result<(), RepositoryError> {
        let taken = self.recruitments.contains_key(&recruitment.id)
            || self
                .recruitments
                .values()
                .any(|existing| existing.name == recruitment.name);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        self.recruitments.insert(recruitment.id.clone(), recruitment);
        Ok(())
    }

    fn update_recruitment(&mut self, recruitment: Recruitment) -> Result<(), RepositoryError> {
        if !self.recruitments.contains_key(&recruitment.id) {
            return Err(RepositoryError::NotFound);
        }
        let renamed_onto_other = self
            .recruitments
            .values()
            .any(|existing| existing.id != recruitment.id && existing.name == recruitment.name);
        if renamed_onto_other {
            return Err(RepositoryError::Conflict);
        }
        self.recruitments.insert(recruitment.id.clone(), recruitment);
        Ok(())
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.applications.get(id).cloned())
    }

    fn application_for(
        &self,
        candidate: &UserId,
        recruitment: &RecruitmentId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .applications
            .values()
            .find(|application| {
                &application.candidate_id == candidate && &application.recruitment_id == recruitment
            })
            .cloned())
    }

    fn applications_in(
        &self,
        recruitment: &RecruitmentId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .applications
            .values()
            .filter(|application| &application.recruitment_id == recruitment)
            .cloned()
            .collect())
    }

    fn insert_application(&mut self, application: Application) -> Result<(), RepositoryError> {
        if self.applications.contains_key(&application.id)
            || self
                .application_for(&application.candidate_id, &application.recruitment_id)?
                .is_some()
        {
            return Err(RepositoryError::Conflict);
        }
        self.applications.insert(application.id.clone(), application);
        Ok(())
    }

    fn update_application(&mut self, application: Application) -> Result<(), RepositoryError> {
        match self.applications.get_mut(&application.id) {
            Some(stored) => {
                *stored = application;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn interview(&self, id: &InterviewId) -> Result<Option<Interview>, RepositoryError> {
        Ok(self.interviews.get(id).cloned())
    }

    fn interviews_named(
        &self,
        recruitment: &RecruitmentId,
        name: Group,
    ) -> Result<Vec<Interview>, RepositoryError> {
        let mut slots: Vec<Interview> = self
            .interviews
            .values()
            .filter(|interview| &interview.recruitment_id == recruitment && interview.name == name)
            .cloned()
            .collect();
        slots.sort_by(|a, b| {
            (a.slot.date, a.slot.start, &a.id).cmp(&(b.slot.date, b.slot.start, &b.id))
        });
        Ok(slots)
    }

    fn insert_interview(&mut self, interview: Interview) -> Result<(), RepositoryError> {
        if self.interviews.contains_key(&interview.id) || self.schedule_taken(&interview) {
            return Err(RepositoryError::Conflict);
        }
        self.interviews.insert(interview.id.clone(), interview);
        Ok(())
    }

    fn update_interview(&mut self, interview: Interview) -> Result<(), RepositoryError> {
        if !self.interviews.contains_key(&interview.id) {
            return Err(RepositoryError::NotFound);
        }
        if self.schedule_taken(&interview) {
            return Err(RepositoryError::Conflict);
        }
        self.interviews.insert(interview.id.clone(), interview);
        Ok(())
    }

    fn delete_interview(&mut self, id: &InterviewId) -> Result<(), RepositoryError> {
        self.interviews
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn selections(&self, application: &ApplicationId) -> Result<Vec<InterviewId>, RepositoryError> {
        Ok(self
            .selections
            .iter()
            .filter(|(selected_by, _)| selected_by == application)
            .map(|(_, interview)| interview.clone())
            .collect())
    }

    fn clear_selections(
        &mut self,
        application: &ApplicationId,
        scope: &[InterviewId],
    ) -> Result<(), RepositoryError> {
        self.selections
            .retain(|(selected_by, interview)| selected_by != application || !scope.contains(interview));
        Ok(())
    }

    fn add_selections(
        &mut self,
        application: &ApplicationId,
        interviews: &[InterviewId],
    ) -> Result<(), RepositoryError> {
        for interview in interviews {
            self.selections
                .insert((application.clone(), interview.clone()));
        }
        Ok(())
    }

    fn selected_among(&self, candidates: &[InterviewId]) -> Result<Vec<InterviewId>, RepositoryError> {
        let selected: BTreeSet<&InterviewId> =
            self.selections.iter().map(|(_, interview)| interview).collect();
        Ok(candidates
            .iter()
            .filter(|candidate| selected.contains(candidate))
            .cloned()
            .collect())
    }

    fn allocated_among(
        &self,
        kind: InterviewKind,
        candidates: &[InterviewId],
    ) -> Result<Vec<InterviewId>, RepositoryError> {
        let allocated: BTreeSet<&InterviewId> = self
            .applications
            .values()
            .filter_map(|application| application.allocation(kind))
            .collect();
        Ok(candidates
            .iter()
            .filter(|candidate| allocated.contains(candidate))
            .cloned()
            .collect())
    }

    fn comments_for(&self, application: &ApplicationId) -> Result<Vec<Comment>, RepositoryError> {
        let mut comments: Vec<Comment> = self
            .comments
            .values()
            .filter(|comment| &comment.application_id == application)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    fn comment(&self, id: &CommentId) -> Result<Option<Comment>, RepositoryError> {
        Ok(self.comments.get(id).cloned())
    }

    fn insert_comment(&mut self, comment: Comment) -> Result<(), RepositoryError> {
        if self.comments.contains_key(&comment.id) {
            return Err(RepositoryError::Conflict);
        }
        self.comments.insert(comment.id.clone(), comment);
        Ok(())
    }

    fn delete_comment(&mut self, id: &CommentId) -> Result<(), RepositoryError> {
        self.comments
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::recruitment::domain::{Period, SlotFields};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn slot(id: &str, hour: u32) -> Interview {
        Interview {
            id: InterviewId::new(id),
            recruitment_id: RecruitmentId::new("rec-1"),
            name: Group::Web,
            slot: SlotFields {
                date: NaiveDate::from_ymd_opt(2024, 5, 20).expect("valid date"),
                period: Period::Afternoon,
                start: Utc.with_ymd_and_hms(2024, 5, 20, hour, 0, 0).single().expect("valid"),
                end: Utc.with_ymd_and_hms(2024, 5, 20, hour + 1, 0, 0).single().expect("valid"),
            },
        }
    }

    #[test]
    fn failed_transaction_discards_writes() {
        let repository = InMemoryRecruitmentRepository::new();
        let result: Result<(), RepositoryError> = repository.transaction(|tx| {
            tx.insert_interview(slot("int-1", 14))?;
            Err(RepositoryError::Unavailable("boom".to_string()))
        });
        assert!(result.is_err());

        let stored = repository
            .transaction(|tx| tx.interview(&InterviewId::new("int-1")))
            .expect("read succeeds");
        assert!(stored.is_none());
    }

    #[test]
    fn duplicate_schedule_key_is_a_conflict() {
        let repository = InMemoryRecruitmentRepository::new();
        let result: Result<(), RepositoryError> = repository.transaction(|tx| {
            tx.insert_interview(slot("int-1", 14))?;
            tx.insert_interview(slot("int-2", 14))
        });
        assert_eq!(result, Err(RepositoryError::Conflict));
    }

    #[test]
    fn clear_selections_only_touches_scope() {
        let repository = InMemoryRecruitmentRepository::new();
        let application = ApplicationId::new("app-1");
        let remaining = repository
            .transaction(|tx| {
                tx.add_selections(
                    &application,
                    &[InterviewId::new("int-1"), InterviewId::new("int-2")],
                )?;
                tx.clear_selections(&application, &[InterviewId::new("int-1")])?;
                tx.selections(&application)
            })
            .expect("transaction commits");
        assert_eq!(remaining, vec![InterviewId::new("int-2")]);
    }
}
