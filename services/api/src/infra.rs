use metrics_exporter_prometheus::PrometheusHandle;
use recruitment::workflows::recruitment::{
    Group, InMemoryDirectory, NotificationTransport, OutboundMessage, Role, TransportError,
    UserDetail, UserId,
};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Transport that logs each message instead of calling the SMS vendor, and keeps a copy.
#[derive(Default, Clone)]
pub(crate) struct LoggingTransport {
    outbox: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl NotificationTransport for LoggingTransport {
    fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        info!(
            template = message.template_id,
            phone = %message.phone,
            params = ?message.params,
            "sms queued"
        );
        let mut guard = self
            .outbox
            .lock()
            .map_err(|_| TransportError::Unavailable("outbox mutex poisoned".to_string()))?;
        guard.push(message.clone());
        Ok(())
    }
}

impl LoggingTransport {
    pub(crate) fn messages(&self) -> Vec<OutboundMessage> {
        match self.outbox.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

pub(crate) fn load_directory(path: &Path) -> std::io::Result<InMemoryDirectory> {
    let reader = BufReader::new(File::open(path)?);
    let users: Vec<UserDetail> = serde_json::from_reader(reader)?;
    Ok(InMemoryDirectory::new(users))
}

pub(crate) const DEMO_ADMIN: &str = "admin";
pub(crate) const DEMO_MEMBER: &str = "web-lead";
pub(crate) const DEMO_CANDIDATES: [&str; 2] = ["cand-zhang", "cand-li"];

fn demo_user(uid: &str, name: &str, phone: &str, groups: Vec<Group>, roles: Vec<Role>) -> UserDetail {
    UserDetail {
        uid: UserId::new(uid),
        name: name.to_string(),
        phone: phone.to_string(),
        email: format!("{uid}@example.org"),
        groups,
        roles,
    }
}

/// Directory used when no file is given: one admin, one web member, two candidates.
pub(crate) fn demo_directory() -> InMemoryDirectory {
    InMemoryDirectory::new(vec![
        demo_user(DEMO_ADMIN, "管理员", "13700000000", vec![Group::Web], vec![Role::Admin]),
        demo_user(DEMO_MEMBER, "Web 组长", "13700000001", vec![Group::Web], vec![Role::Member]),
        demo_user(DEMO_CANDIDATES[0], "张三", "13900000001", Vec::new(), vec![Role::Candidate]),
        demo_user(DEMO_CANDIDATES[1], "李四", "13900000002", Vec::new(), vec![Role::Candidate]),
    ])
}
