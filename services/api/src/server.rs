use crate::cli::ServeArgs;
use crate::infra::{build_portal, AppState};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use pmw_review::config::AppConfig;
use pmw_review::error::AppError;
use pmw_review::telemetry;
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
    if let Some(path) = args.distribution_csv.take() {
        config.portal.distribution_csv = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (portal, seeded) = build_portal(config.portal.distribution_csv.as_deref(), Vec::new())?;
    info!(
        seeded,
        source = ?config.portal.distribution_csv,
        "portal store seeded from distribution"
    );

    let app = with_portal_routes(portal, &config.portal.api_base)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        api_base = %config.portal.api_base,
        "pmw review portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
