use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use super::super::domain::Group;
use super::super::steps::Step;

/// Templates registered with the SMS vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SmsTemplate {
    Interviews,
    Pass,
    Delay,
    OnlineGroupInterview,
    OnlineTeamInterview,
}

impl SmsTemplate {
    pub const fn id(self) -> u32 {
        match self {
            SmsTemplate::Interviews => 1_113_517,
            SmsTemplate::Pass => 1_092_767,
            SmsTemplate::Delay => 1_092_765,
            SmsTemplate::OnlineGroupInterview => 1_533_304,
            SmsTemplate::OnlineTeamInterview => 1_533_302,
        }
    }
}

pub const MESSAGE_SUFFIX: &str = " (请勿回复本短信)";
pub const DEFAULT_REJECT_REST: &str = "不要灰心，继续学习。期待与更强大的你的相遇！";
pub const TIME_SELECTION_REST: &str = "，请进入选手dashboard系统选择面试时间";

pub fn attend_rest(time: &str, place: &str, step: Step) -> String {
    format!("，请于{time}在{place}参加{}，请务必准时到场", step.localized())
}

pub fn joined_rest(group: Group) -> String {
    format!("，你已成功加入{group}组")
}

/// Caller text replaces the default; the do-not-reply suffix is always appended.
pub fn closing(rest: &str, default: &str) -> String {
    let body = if rest.is_empty() { default } else { rest };
    format!("{body}{MESSAGE_SUFFIX}")
}

/// Renders an interview start in the candidate's local time, e.g.
/// `2024年5月20日 Monday 14时00分00秒`.
pub fn interview_time(start: DateTime<Utc>, offset: FixedOffset) -> String {
    start
        .with_timezone(&offset)
        .format("%Y年%-m月%-d日 %A %H时%M分%S秒")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn interview_time_is_rendered_in_local_offset() {
        let start = Utc
            .with_ymd_and_hms(2024, 5, 20, 6, 0, 0)
            .single()
            .expect("valid timestamp");
        let beijing = FixedOffset::east_opt(8 * 3600).expect("valid offset");
        assert_eq!(interview_time(start, beijing), "2024年5月20日 Monday 14时00分00秒");
    }

    #[test]
    fn vendor_ids_cover_every_candidate_notice() {
        let ids: Vec<u32> = [
            SmsTemplate::Interviews,
            SmsTemplate::Pass,
            SmsTemplate::Delay,
            SmsTemplate::OnlineGroupInterview,
            SmsTemplate::OnlineTeamInterview,
        ]
        .into_iter()
        .map(SmsTemplate::id)
        .collect();
        assert_eq!(ids, vec![1_113_517, 1_092_767, 1_092_765, 1_533_304, 1_533_302]);
    }

    #[test]
    fn closing_prefers_caller_text() {
        assert_eq!(closing("", "默认"), "默认 (请勿回复本短信)");
        assert_eq!(closing("自定义", "默认"), "自定义 (请勿回复本短信)");
    }
}
