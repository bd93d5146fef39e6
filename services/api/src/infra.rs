use metrics_exporter_prometheus::PrometheusHandle;
use shortlist::config::AppConfig;
use shortlist::{
    AppError, InMemoryQueueCache, InMemoryStore, NoTravelTimes, ShortlistService,
    TravelTimeLookup, TravelTimeTable,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type ApiService = ShortlistService<InMemoryStore, InMemoryQueueCache>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the precomputed route table, or falls back to unknown travel times.
pub(crate) fn load_travel_times(
    path: Option<&Path>,
) -> Result<Arc<dyn TravelTimeLookup>, AppError> {
    match path {
        Some(path) => {
            let table = TravelTimeTable::from_path(path)?;
            info!(routes = table.len(), path = %path.display(), "travel times loaded");
            Ok(Arc::new(table))
        }
        None => {
            warn!("no travel-time table configured; travel criteria stay unscored");
            Ok(Arc::new(NoTravelTimes))
        }
    }
}

/// In-memory service with the household registered and the builtin
/// criteria synchronized.
pub(crate) fn build_service(
    config: &AppConfig,
    travel: Arc<dyn TravelTimeLookup>,
) -> Result<ApiService, AppError> {
    let service = ShortlistService::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryQueueCache::new()),
        travel,
    );
    let users = service.register_household(&config.household.members)?;
    let sync = service.sync_catalog()?;
    info!(
        household = users.len(),
        criteria = sync.criteria_created,
        "shortlist service initialised"
    );
    Ok(service)
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    use shortlist::config::{
        AppEnvironment, HouseholdConfig, ScoringConfig, ServerConfig, TelemetryConfig,
    };

    AppConfig {
        environment: AppEnvironment::Development,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        telemetry: TelemetryConfig {
            log_level: "info".to_string(),
        },
        household: HouseholdConfig {
            members: vec!["ben".to_string(), "melissa".to_string()],
        },
        scoring: ScoringConfig {
            travel_times: None,
            queue_rebuild_interval: None,
        },
    }
}
