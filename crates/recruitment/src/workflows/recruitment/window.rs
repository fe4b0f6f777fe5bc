//! Recruitment time-window checks. All functions are pure; callers pass `now`.

use chrono::{DateTime, Utc};

use super::domain::Recruitment;
use super::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("recruitment has not started yet (begins {beginning})")]
    TooEarly { beginning: DateTime<Utc> },
    #[error("the application deadline passed at {deadline}")]
    DeadlinePassed { deadline: DateTime<Utc> },
    #[error("recruitment has already ended (ended {end})")]
    CycleEnded { end: DateTime<Utc> },
}

/// Window for filing or editing an application: `beginning..=deadline`.
pub fn in_submission_window(
    beginning: DateTime<Utc>,
    deadline: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), WindowError> {
    in_active_window(beginning, end, now)?;
    if now > deadline {
        return Err(WindowError::DeadlinePassed { deadline });
    }
    Ok(())
}

/// Window for step moves and slot work: `beginning..=end`, deadline ignored.
pub fn in_active_window(
    beginning: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), WindowError> {
    if now < beginning {
        return Err(WindowError::TooEarly { beginning });
    }
    not_ended(end, now)
}

pub fn not_ended(end: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), WindowError> {
    if now > end {
        return Err(WindowError::CycleEnded { end });
    }
    Ok(())
}

pub fn validate_schedule(
    beginning: DateTime<Utc>,
    deadline: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if beginning > deadline || deadline > end {
        return Err(ValidationError::ScheduleOutOfOrder);
    }
    Ok(())
}

/// Names look like `2024S`: a four digit year and a season code.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let bytes = name.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && matches!(bytes[4], b'S' | b'C' | b'A');
    if !well_formed {
        return Err(ValidationError::InvalidRecruitmentName(name.to_string()));
    }
    Ok(())
}

impl Recruitment {
    pub fn submission_window(&self, now: DateTime<Utc>) -> Result<(), WindowError> {
        in_submission_window(self.beginning, self.deadline, self.end, now)
    }

    pub fn active_window(&self, now: DateTime<Utc>) -> Result<(), WindowError> {
        in_active_window(self.beginning, self.end, now)
    }

    pub fn not_ended(&self, now: DateTime<Utc>) -> Result<(), WindowError> {
        not_ended(self.end, now)
    }
}
