use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_triage_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use grievance_triage::config::AppConfig;
use grievance_triage::error::AppError;
use grievance_triage::telemetry;
use grievance_triage::workflows::triage::{
    InMemoryReportRepository, InMemoryWorkflowRepository, TriageService,
};
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

    let triage_service = Arc::new(TriageService::new(
        Arc::new(InMemoryWorkflowRepository::default()),
        Arc::new(InMemoryReportRepository::default()),
        config.triage.clone(),
    ));

    let app = with_triage_routes(triage_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        batch_size = config.triage.reassign_batch_size,
        "grievance triage service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
