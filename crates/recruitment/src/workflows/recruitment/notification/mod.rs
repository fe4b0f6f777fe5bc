//! Candidate notifications: which template to send after a step decision and with which
//! positional parameters.

pub mod resolver;
pub mod templates;

use serde::{Deserialize, Serialize};

use super::domain::ApplicationId;
use super::errors::{StateConflict, ValidationError};
use super::repository::OutboundMessage;
use super::steps::Step;

pub use resolver::{resolve_notification, Recipient};
pub use templates::SmsTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Accept,
    Reject,
}

/// Member request to notify candidates about a step decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub current: Step,
    /// Defaults to `current`.
    #[serde(default)]
    pub next: Option<Step>,
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub meeting_id: String,
    #[serde(default)]
    pub rest: String,
    #[serde(default, rename = "aids")]
    pub applications: Vec<ApplicationId>,
}

impl NotificationRequest {
    pub fn next_step(&self) -> Step {
        self.next.unwrap_or(self.current)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePlan {
    pub template: SmsTemplate,
    pub params: Vec<String>,
}

impl MessagePlan {
    pub fn addressed_to(self, phone: impl Into<String>) -> OutboundMessage {
        OutboundMessage {
            template_id: self.template.id(),
            phone: phone.into(),
            params: self.params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] StateConflict),
}
