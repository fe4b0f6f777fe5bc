use crate::cli::ServeArgs;
use crate::infra::{demo_directory, load_directory, AppState, LoggingTransport};
use crate::routes::with_recruitment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use recruitment::config::AppConfig;
use recruitment::error::AppError;
use recruitment::telemetry;
use recruitment::workflows::recruitment::{InMemoryRecruitmentRepository, RecruitmentService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = match args.directory.take() {
        Some(path) => {
            let directory = load_directory(&path)?;
            info!(path = %path.display(), users = directory.len(), "user directory loaded");
            directory
        }
        None => demo_directory(),
    };
    let service = Arc::new(RecruitmentService::new(
        Arc::new(InMemoryRecruitmentRepository::new()),
        Arc::new(directory),
        Arc::new(LoggingTransport::default()),
        config.notification,
    ));

    let app = with_recruitment_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "recruitment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
