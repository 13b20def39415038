use crate::cli::ServeArgs;
use crate::infra::{build_intake, storage_label, AppState};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use resume_intake::config::AppConfig;
use resume_intake::error::AppError;
use resume_intake::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    if config.credentials.access_token.is_none() {
        warn!("STORAGE_ACCESS_TOKEN is not set; submissions will be refused until it is provided");
    }
    let intake = build_intake(&config)?;

    let app = with_intake_routes(intake)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        storage = storage_label(&config.storage),
        form_id = %config.forms.form_id,
        "résumé intake ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
