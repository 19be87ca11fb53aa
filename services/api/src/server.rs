use crate::cli::ServeArgs;
use crate::infra::{build_service, load_interviews, AppState};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use interview_pipeline::config::AppConfig;
use interview_pipeline::error::AppError;
use interview_pipeline::telemetry;
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

    let seed = args.interviews.take().or_else(|| config.interviews_path.clone());
    let interviews = load_interviews(seed.as_deref())?;
    let interview_count = interviews.len();

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let pipeline_service = build_service(interviews, &config.pipeline);

    let app = with_pipeline_routes(pipeline_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        interviews = interview_count,
        analysis_timeout_secs = config.pipeline.analysis_timeout.as_secs(),
        "interview pipeline ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
