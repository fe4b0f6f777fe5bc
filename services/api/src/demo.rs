use crate::infra::{demo_directory, LoggingTransport, DEMO_ADMIN, DEMO_CANDIDATES, DEMO_MEMBER};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use recruitment::config::NotificationConfig;
use recruitment::error::AppError;
use recruitment::workflows::recruitment::{
    Application, ApplicationForm, DispatchReport, Group, InMemoryDirectory, InMemoryRecruitmentRepository,
    InterviewKind, NotificationKind, NotificationRequest, Period, RecruitmentDraft,
    RecruitmentService, SlotFields, Step, UserId,
};
use std::sync::Arc;

type DemoService =
    RecruitmentService<InMemoryRecruitmentRepository, InMemoryDirectory, LoggingTransport>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First day of the demo cycle (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Hold the group interviews online instead of in person.
    #[arg(long)]
    pub(crate) online: bool,
    /// Reject the second candidate instead of inviting them.
    #[arg(long)]
    pub(crate) reject_second: bool,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Season code for a cycle opening in `month`: spring until May, camp over the summer,
/// autumn afterwards.
fn cycle_name(start: NaiveDate) -> String {
    let season = match start.month() {
        1..=5 => 'S',
        6..=8 => 'C',
        _ => 'A',
    };
    format!("{}{season}", start.year())
}

fn at(start: NaiveDate, days: i64, hour: u32) -> DateTime<Utc> {
    let midnight = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN));
    midnight + Duration::days(days) + Duration::hours(i64::from(hour))
}

fn slot(start: NaiveDate, days: i64, hour: u32) -> SlotFields {
    let begins = at(start, days, hour);
    SlotFields {
        date: begins.date_naive(),
        period: if hour < 12 {
            Period::Morning
        } else if hour < 18 {
            Period::Afternoon
        } else {
            Period::Evening
        },
        start: begins,
        end: begins + Duration::minutes(45),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        start,
        online,
        reject_second,
    } = args;
    let start = start.unwrap_or_else(|| Utc::now().date_naive());

    let transport = LoggingTransport::default();
    let service: DemoService = RecruitmentService::new(
        Arc::new(InMemoryRecruitmentRepository::new()),
        Arc::new(demo_directory()),
        Arc::new(transport.clone()),
        NotificationConfig::default(),
    );
    let admin = UserId::new(DEMO_ADMIN);
    let member = UserId::new(DEMO_MEMBER);

    println!("Recruitment cycle demo");
    let recruitment = service.create_recruitment(
        &admin,
        RecruitmentDraft {
            name: cycle_name(start),
            beginning: at(start, 0, 0),
            deadline: at(start, 7, 0),
            end: at(start, 30, 0),
        },
    )?;
    println!(
        "- Opened {} ({}): submissions until {}, cycle ends {}",
        recruitment.name,
        recruitment.title(),
        recruitment.deadline.format("%Y-%m-%d"),
        recruitment.end.format("%Y-%m-%d")
    );

    let mut applications: Vec<Application> = Vec::new();
    for candidate in DEMO_CANDIDATES {
        let form = ApplicationForm {
            recruitment_id: recruitment.id.clone(),
            group: Group::Web,
            grade: "大二".to_string(),
            institute: "计算机学院".to_string(),
            major: "软件工程".to_string(),
            rank: "前 30%".to_string(),
            intro: "对前端和后端都感兴趣".to_string(),
            is_quick: false,
            referrer: String::new(),
            resume: None,
        };
        let application = service.submit_application(&UserId::new(candidate), form, at(start, 1, 10))?;
        println!("- {} applied to {} as {}", candidate, application.group, application.id);
        applications.push(application);
    }

    let late = service.submit_application(
        &UserId::new(DEMO_CANDIDATES[0]),
        ApplicationForm {
            recruitment_id: recruitment.id.clone(),
            group: Group::Ai,
            grade: String::new(),
            institute: String::new(),
            major: String::new(),
            rank: String::new(),
            intro: String::new(),
            is_quick: true,
            referrer: String::new(),
            resume: None,
        },
        at(start, 8, 10),
    );
    if let Err(err) = late {
        println!("- Late application refused: {err}");
    }

    for application in &applications {
        service.transition_step(
            &member,
            &application.id,
            Step::SignUp,
            Step::GroupTimeSelection,
            at(start, 8, 9),
        )?;
    }
    let ids: Vec<_> = applications.iter().map(|application| application.id.clone()).collect();
    let report = service.send_notifications(
        &member,
        &NotificationRequest {
            kind: NotificationKind::Accept,
            current: Step::SignUp,
            next: Some(Step::GroupTimeSelection),
            place: String::new(),
            time: String::new(),
            meeting_id: String::new(),
            rest: String::new(),
            applications: ids,
        },
        at(start, 8, 10),
    )?;
    print_dispatch("time selection notice", &report);

    let slots = service.create_interviews(
        &member,
        &recruitment.id,
        Group::Web,
        &[slot(start, 10, 14), slot(start, 10, 15)],
        at(start, 8, 11),
    )?;
    println!("- Published {} group interview slots", slots.created.len());

    let first_slot = &slots.created[0];
    let diff = service.select_slots(
        &UserId::new(DEMO_CANDIDATES[0]),
        &applications[0].id,
        InterviewKind::Group,
        std::slice::from_ref(first_slot),
        at(start, 9, 8),
    )?;
    println!("- {} picked {:?}", DEMO_CANDIDATES[0], diff.to_add);

    match service.update_interview(&member, first_slot, slot(start, 11, 9), at(start, 9, 9)) {
        Ok(_) => println!("- Slot {first_slot} moved"),
        Err(err) => println!("- Slot edit refused: {err}"),
    }

    let (invited, declined) = if reject_second {
        (&applications[..1], &applications[1..])
    } else {
        (&applications[..], &applications[..0])
    };

    for (application, interview) in invited.iter().zip(&slots.created) {
        service.allocate_interview(
            &member,
            &application.id,
            InterviewKind::Group,
            interview,
            at(start, 9, 10),
        )?;
    }

    for application in declined {
        service.reject_application(&member, &application.id)?;
    }
    if !declined.is_empty() {
        let report = service.send_notifications(
            &member,
            &NotificationRequest {
                kind: NotificationKind::Reject,
                current: Step::GroupTimeSelection,
                next: None,
                place: String::new(),
                time: String::new(),
                meeting_id: String::new(),
                rest: String::new(),
                applications: declined.iter().map(|application| application.id.clone()).collect(),
            },
            at(start, 9, 11),
        )?;
        print_dispatch("rejection notice", &report);
    }

    let (next, place, meeting_id) = if online {
        (Step::OnlineGroupInterview, String::new(), "893-227-104".to_string())
    } else {
        (Step::GroupInterview, "科技楼南楼 702".to_string(), String::new())
    };
    let report = service.send_notifications(
        &member,
        &NotificationRequest {
            kind: NotificationKind::Accept,
            current: Step::GroupTimeSelection,
            next: Some(next),
            place,
            time: String::new(),
            meeting_id,
            rest: String::new(),
            applications: invited.iter().map(|application| application.id.clone()).collect(),
        },
        at(start, 9, 12),
    )?;
    print_dispatch("interview notice", &report);

    let statistics = service.statistics(&member, &recruitment.id)?;
    println!("- {} applications in total", statistics.total);
    for (group, count) in &statistics.per_group {
        println!("  - {group}: {count}");
    }

    println!("Outbound messages:");
    for message in transport.messages() {
        println!(
            "  - template={} -> {} {:?}",
            message.template_id, message.phone, message.params
        );
    }

    Ok(())
}

fn print_dispatch(label: &str, report: &DispatchReport) {
    println!(
        "- Sent {label}: {} delivered, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  - {}: {}", failure.id, failure.reason);
    }
}
