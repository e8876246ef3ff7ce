use crate::cli::ServeArgs;
use crate::infra::{clock_for, file_store, open_engine, AppState, EngineHandle};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use statekeeper::config::AppConfig;
use statekeeper::error::AppError;
use statekeeper::notify::TracingNotifier;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut config: AppConfig, mut args: ServeArgs) -> Result<(), AppError> {
    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(file_store(&config));
    let engine = open_engine(
        &config,
        store.as_ref(),
        clock_for(None),
        Arc::new(TracingNotifier),
    )?;
    info!(
        states = engine.registry().states().len(),
        licenses = engine.licenses().len(),
        data_dir = %store.root().display(),
        "compliance data loaded"
    );

    let app = with_service_routes(EngineHandle::new(engine, store))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "compliance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
