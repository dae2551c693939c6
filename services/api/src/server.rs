use crate::cli::ServeArgs;
use crate::infra::{build_staffing_context, AppState};
use crate::routes::roster_router;
use crate::scheduler;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use clinic_roster::config::AppConfig;
use clinic_roster::error::AppError;
use clinic_roster::telemetry;
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
    let staffing = build_staffing_context(config.roster.clone())?;
    let cycle_lock = Arc::new(tokio::sync::Mutex::new(()));

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        staffing: staffing.clone(),
        cycle_lock: cycle_lock.clone(),
    };

    scheduler::spawn_background_tasks(staffing, cycle_lock);

    let app = roster_router()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "clinic roster service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
