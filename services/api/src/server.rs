use crate::cli::ServeArgs;
use crate::infra::{bootstrap_admin, AppState};
use crate::routes::{with_back_office_routes, BackOffice};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use regulariza::config::AppConfig;
use regulariza::error::AppError;
use regulariza::memory::InMemoryStore;
use regulariza::storage::FsFileStore;
use regulariza::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryStore::new());
    bootstrap_admin(store.as_ref(), &args.admin)?;
    let files = Arc::new(FsFileStore::new(config.storage.media_root.clone()));

    let app = with_back_office_routes(BackOffice {
        store,
        files,
        import: config.import.clone(),
        max_upload_bytes: config.storage.max_upload_bytes,
    })
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        media_root = %config.storage.media_root.display(),
        max_upload_bytes = config.storage.max_upload_bytes,
        "back office ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
