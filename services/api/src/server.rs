use crate::cli::ServeArgs;
use crate::infra::{build_service, load_travel_times, ApiService, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use shortlist::config::AppConfig;
use shortlist::{telemetry, AppError, ListingImporter};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
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

    let travel = load_travel_times(config.scoring.travel_times.as_deref())?;
    let service = Arc::new(build_service(&config, travel)?);

    if let Some(path) = args.listings.take() {
        let listings = ListingImporter::from_path(&path)?;
        let report = service.ingest_batch(listings)?;
        info!(
            created = report.created.len(),
            duplicates = report.duplicates,
            path = %path.display(),
            "listing export loaded"
        );
    }
    service.rebuild_all_queues()?;

    if let Some(every) = config.scoring.queue_rebuild_interval {
        spawn_queue_rebuild(service.clone(), every);
    }

    let app = with_operational_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "shortlist service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodic full rebuild of every household member's review queue.
fn spawn_queue_rebuild(service: Arc<ApiService>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick fires immediately; startup already rebuilt
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match service.rebuild_all_queues() {
                Ok(users) => info!(users, "review queues rebuilt"),
                Err(err) => warn!(error = %err, "review queue rebuild failed"),
            }
        }
    });
}
