use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryRequestRepository, InMemoryResultRepository, LocalDocumentStore,
};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use veritas::config::AppConfig;
use veritas::error::AppError;
use veritas::telemetry;
use veritas::verification::{HttpProviderTransport, VerificationServices};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    if config.provider.credentials.is_none() {
        warn!("MIE_USERNAME/MIE_PASSWORD not set; submissions and probes will be refused");
    }
    if config.callback.credentials.is_none() {
        warn!("MIE_CALLBACK_USERNAME/MIE_CALLBACK_PASSWORD not set; callbacks will be refused");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let documents = Arc::new(LocalDocumentStore::new(&config.documents));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        documents: documents.clone(),
    };

    let services = VerificationServices::assemble(
        config.provider.clone(),
        config.callback.clone(),
        Arc::new(InMemoryRequestRepository::default()),
        Arc::new(InMemoryResultRepository::default()),
        documents.clone(),
        Arc::new(HttpProviderTransport::new(config.provider.timeout)),
    );

    let app = with_service_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        provider = %config.provider.endpoint,
        documents = %documents.directory().display(),
        callback_limit = config.callback.max_body_bytes,
        "verification service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
