use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::steps::Step;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a recruitment cycle.
    RecruitmentId
);
string_id!(
    /// Identifier of a candidate's application to one recruitment.
    ApplicationId
);
string_id!(
    /// Identifier of a bookable interview slot.
    InterviewId
);
string_id!(CommentId);
string_id!(
    /// Identity-service user id, shared by candidates and members.
    UserId
);

/// Teams a candidate can apply to. `Unique` is the sentinel used for team-wide interviews and
/// is never a valid application group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Web,
    Lab,
    Ai,
    Game,
    Mobile,
    Android,
    Ios,
    Design,
    Pm,
    Unique,
}

impl Group {
    pub const ALL: [Group; 10] = [
        Group::Web,
        Group::Lab,
        Group::Ai,
        Group::Game,
        Group::Mobile,
        Group::Android,
        Group::Ios,
        Group::Design,
        Group::Pm,
        Group::Unique,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Group::Web => "web",
            Group::Lab => "lab",
            Group::Ai => "ai",
            Group::Game => "game",
            Group::Mobile => "mobile",
            Group::Android => "android",
            Group::Ios => "ios",
            Group::Design => "design",
            Group::Pm => "pm",
            Group::Unique => "unique",
        }
    }

    pub const fn is_team_sentinel(self) -> bool {
        matches!(self, Group::Unique)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Group {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Group::ALL
            .into_iter()
            .find(|group| group.label() == normalized)
            .ok_or_else(|| ValidationError::UnknownGroup(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Afternoon,
    Evening,
}

/// The two interview rounds a slot can be allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewKind {
    Group,
    Team,
}

impl InterviewKind {
    /// Interview `name` that slots of this kind carry for an application filed to `group`.
    pub const fn slot_name(self, group: Group) -> Group {
        match self {
            InterviewKind::Group => group,
            InterviewKind::Team => Group::Unique,
        }
    }

    /// Step during which the candidate may pick slots of this kind.
    pub const fn selection_step(self) -> Step {
        match self {
            InterviewKind::Group => Step::GroupTimeSelection,
            InterviewKind::Team => Step::TeamTimeSelection,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            InterviewKind::Group => "group",
            InterviewKind::Team => "team",
        }
    }
}

impl fmt::Display for InterviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InterviewKind {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "group" => Ok(InterviewKind::Group),
            "team" => Ok(InterviewKind::Team),
            _ => Err(ValidationError::UnknownInterviewKind(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Evaluation {
    Good,
    Normal,
    Bad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Candidate,
    Member,
    Admin,
}

/// A recruitment cycle. Applications may be filed between `beginning` and `deadline`; the
/// cycle stays active (steps, interviews) until `end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recruitment {
    pub id: RecruitmentId,
    pub name: String,
    pub beginning: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub stress_test_start: Option<DateTime<Utc>>,
    pub stress_test_end: Option<DateTime<Utc>>,
}

impl Recruitment {
    /// Human title used in candidate messages, e.g. `2024S` becomes `2024春季招新`.
    pub fn title(&self) -> String {
        recruitment_title(&self.name)
    }
}

pub(crate) fn recruitment_title(name: &str) -> String {
    let mut chars = name.char_indices();
    let split = match chars.nth(4) {
        Some((index, _)) => index,
        None => return name.to_string(),
    };
    let (year, season) = name.split_at(split);
    let suffix = match season {
        "S" | "春" => "春季招新",
        "C" | "夏" => "夏令营招新",
        "A" | "秋" => "秋季招新",
        _ => return name.to_string(),
    };
    format!("{year}{suffix}")
}

/// Admin input for a new recruitment cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruitmentDraft {
    pub name: String,
    pub beginning: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Partial schedule edit; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub beginning: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// A candidate's application. `abandoned` and `rejected` are independent flags; either one
/// freezes the application against further mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub recruitment_id: RecruitmentId,
    pub candidate_id: UserId,
    pub group: Group,
    pub step: Step,
    pub abandoned: bool,
    pub rejected: bool,
    pub grade: String,
    pub institute: String,
    pub major: String,
    pub rank: String,
    pub intro: String,
    pub is_quick: bool,
    pub referrer: String,
    pub resume: Option<String>,
    pub answer: Option<String>,
    pub group_allocation: Option<InterviewId>,
    pub team_allocation: Option<InterviewId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn is_terminated(&self) -> bool {
        self.abandoned || self.rejected
    }

    pub fn allocation(&self, kind: InterviewKind) -> Option<&InterviewId> {
        match kind {
            InterviewKind::Group => self.group_allocation.as_ref(),
            InterviewKind::Team => self.team_allocation.as_ref(),
        }
    }

    pub(crate) fn allocation_mut(&mut self, kind: InterviewKind) -> &mut Option<InterviewId> {
        match kind {
            InterviewKind::Group => &mut self.group_allocation,
            InterviewKind::Team => &mut self.team_allocation,
        }
    }
}

/// Candidate-provided intake form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub recruitment_id: RecruitmentId,
    pub group: Group,
    pub grade: String,
    pub institute: String,
    pub major: String,
    pub rank: String,
    pub intro: String,
    #[serde(default)]
    pub is_quick: bool,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub resume: Option<String>,
}

/// Candidate edit of an application. Empty strings and `None` leave the stored value alone,
/// except `referrer`, which is always overwritten so it can be cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationPatch {
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub institute: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub group: Option<Group>,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub is_quick: Option<bool>,
    #[serde(default)]
    pub resume: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

/// Timing fields of a slot; these freeze once the slot is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotFields {
    pub date: NaiveDate,
    pub period: Period,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SlotFields {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start >= self.end {
            return Err(ValidationError::SlotTimesOutOfOrder {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// A bookable interview time slot. `name` is the group it serves, or `Group::Unique` for team
/// interviews. (recruitment, name, date, period, start) is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub recruitment_id: RecruitmentId,
    pub name: Group,
    #[serde(flatten)]
    pub slot: SlotFields,
}

impl Interview {
    pub fn schedule_key(&self) -> (&RecruitmentId, Group, NaiveDate, Period, DateTime<Utc>) {
        (
            &self.recruitment_id,
            self.name,
            self.slot.date,
            self.slot.period,
            self.slot.start,
        )
    }
}

/// One entry of a bulk slot edit: an existing slot with replacement fields, or a new slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredSlot {
    #[serde(default, rename = "uid")]
    pub id: Option<InterviewId>,
    #[serde(flatten)]
    pub slot: SlotFields,
}

/// Member annotation on an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub application_id: ApplicationId,
    pub member_id: UserId,
    pub member_name: String,
    pub content: String,
    pub evaluation: Option<Evaluation>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDraft {
    pub application_id: ApplicationId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub evaluation: Option<Evaluation>,
}

impl CommentDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.evaluation.is_none() && self.content.trim().is_empty() {
            return Err(ValidationError::EmptyComment);
        }
        Ok(())
    }
}
