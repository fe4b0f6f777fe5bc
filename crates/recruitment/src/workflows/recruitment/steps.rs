//! Application step state machine.
//!
//! Steps are a fixed pipeline. Every piece of per-step data (rank, wire name, localized name,
//! accepted aliases, interview channel) lives in [`STEP_TABLE`]. Transitions only check that
//! the caller knows the current step and that the application is not terminated; whether a
//! target step is sensible is the caller's business.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::{Application, InterviewKind};
use super::errors::{StateConflict, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Step {
    SignUp,
    WrittenTest,
    GroupTimeSelection,
    GroupInterview,
    OnlineGroupInterview,
    StressTest,
    TeamTimeSelection,
    TeamInterview,
    OnlineTeamInterview,
    Pass,
}

/// How an interview step is attended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    InPerson,
    Online,
}

#[derive(Debug)]
pub struct StepMetadata {
    pub step: Step,
    pub rank: u8,
    pub wire_name: &'static str,
    pub localized: &'static str,
    /// Extra localized spellings accepted on input.
    pub aliases: &'static [&'static str],
    pub interview: Option<(InterviewKind, Channel)>,
}

pub const STEP_TABLE: [StepMetadata; 10] = [
    StepMetadata {
        step: Step::SignUp,
        rank: 1,
        wire_name: "SignUp",
        localized: "报名",
        aliases: &[],
        interview: None,
    },
    StepMetadata {
        step: Step::WrittenTest,
        rank: 2,
        wire_name: "WrittenTest",
        localized: "笔试",
        aliases: &[],
        interview: None,
    },
    StepMetadata {
        step: Step::GroupTimeSelection,
        rank: 3,
        wire_name: "GroupTimeSelection",
        localized: "组面时间选择",
        aliases: &[],
        interview: None,
    },
    StepMetadata {
        step: Step::GroupInterview,
        rank: 4,
        wire_name: "GroupInterview",
        localized: "组面",
        aliases: &[],
        interview: Some((InterviewKind::Group, Channel::InPerson)),
    },
    StepMetadata {
        step: Step::OnlineGroupInterview,
        rank: 4,
        wire_name: "OnlineGroupInterview",
        localized: "在线组面",
        aliases: &[],
        interview: Some((InterviewKind::Group, Channel::Online)),
    },
    StepMetadata {
        step: Step::StressTest,
        rank: 5,
        wire_name: "StressTest",
        localized: "熬测",
        aliases: &[],
        interview: None,
    },
    StepMetadata {
        step: Step::TeamTimeSelection,
        rank: 6,
        wire_name: "TeamTimeSelection",
        localized: "群面时间选择",
        aliases: &[],
        interview: None,
    },
    // The SMS vendor refuses "群面" in templates, so the outbound name differs from the alias.
    StepMetadata {
        step: Step::TeamInterview,
        rank: 7,
        wire_name: "TeamInterview",
        localized: "团体面试",
        aliases: &["群面"],
        interview: Some((InterviewKind::Team, Channel::InPerson)),
    },
    StepMetadata {
        step: Step::OnlineTeamInterview,
        rank: 7,
        wire_name: "OnlineTeamInterview",
        localized: "在线群面",
        aliases: &[],
        interview: Some((InterviewKind::Team, Channel::Online)),
    },
    StepMetadata {
        step: Step::Pass,
        rank: 8,
        wire_name: "Pass",
        localized: "通过",
        aliases: &[],
        interview: None,
    },
];

impl Step {
    pub const ALL: [Step; 10] = [
        Step::SignUp,
        Step::WrittenTest,
        Step::GroupTimeSelection,
        Step::GroupInterview,
        Step::OnlineGroupInterview,
        Step::StressTest,
        Step::TeamTimeSelection,
        Step::TeamInterview,
        Step::OnlineTeamInterview,
        Step::Pass,
    ];

    pub fn metadata(self) -> &'static StepMetadata {
        &STEP_TABLE[self as usize]
    }

    pub fn rank(self) -> u8 {
        self.metadata().rank
    }

    pub fn wire_name(self) -> &'static str {
        self.metadata().wire_name
    }

    pub fn localized(self) -> &'static str {
        self.metadata().localized
    }

    pub fn interview(self) -> Option<(InterviewKind, Channel)> {
        self.metadata().interview
    }

    /// Accepts the wire name, the localized name, or a localized alias.
    pub fn parse(raw: &str) -> Option<Step> {
        let raw = raw.trim();
        STEP_TABLE
            .iter()
            .find(|meta| {
                meta.wire_name == raw
                    || meta.localized == raw
                    || meta.aliases.iter().any(|alias| *alias == raw)
            })
            .map(|meta| meta.step)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Step {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Step::parse(raw).ok_or_else(|| ValidationError::UnknownStep(raw.to_string()))
    }
}

impl TryFrom<String> for Step {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

/// Guard shared by every operation that mutates an application.
pub fn ensure_mutable(application: &Application) -> Result<(), StateConflict> {
    if application.is_terminated() {
        return Err(StateConflict::Terminated {
            application: application.id.clone(),
        });
    }
    Ok(())
}

/// Moves `application` from `from` to `to`. `from` must match exactly; ranks are not
/// consulted.
pub fn transition(application: &mut Application, from: Step, to: Step) -> Result<(), StateConflict> {
    if application.step != from {
        return Err(StateConflict::StepMismatch {
            application: application.id.clone(),
            expected: from,
            actual: application.step,
        });
    }
    ensure_mutable(application)?;
    application.step = to;
    Ok(())
}

/// Returns whether the flag changed. Already-abandoned applications are left as they are.
pub fn abandon(application: &mut Application) -> bool {
    let changed = !application.abandoned;
    application.abandoned = true;
    changed
}

/// Returns whether the flag changed. Independent of `abandoned`.
pub fn reject(application: &mut Application) -> bool {
    let changed = !application.rejected;
    application.rejected = true;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_discriminant() {
        for step in Step::ALL {
            assert_eq!(step.metadata().step, step);
        }
    }

    #[test]
    fn online_variants_share_rank_with_in_person() {
        assert_eq!(Step::GroupInterview.rank(), Step::OnlineGroupInterview.rank());
        assert_eq!(Step::TeamInterview.rank(), Step::OnlineTeamInterview.rank());
        assert_eq!(Step::SignUp.rank(), 1);
        assert_eq!(Step::Pass.rank(), 8);
    }

    #[test]
    fn parse_accepts_localized_names_and_aliases() {
        assert_eq!(Step::parse("笔试"), Some(Step::WrittenTest));
        assert_eq!(Step::parse("群面"), Some(Step::TeamInterview));
        assert_eq!(Step::parse("团体面试"), Some(Step::TeamInterview));
        assert_eq!(Step::parse("OnlineTeamInterview"), Some(Step::OnlineTeamInterview));
        assert_eq!(Step::parse("Hired"), None);
    }

    #[test]
    fn deserializes_from_wire_and_localized_names() {
        let steps: Vec<Step> =
            serde_json::from_str(r#"["StressTest", "熬测"]"#).expect("steps parse");
        assert_eq!(steps, vec![Step::StressTest, Step::StressTest]);
        assert!(serde_json::from_str::<Step>(r#""Unknown""#).is_err());
        assert_eq!(
            serde_json::to_string(&Step::GroupTimeSelection).expect("serialize"),
            r#""GroupTimeSelection""#
        );
    }
}
