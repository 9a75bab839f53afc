use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use coderr::config::{AppConfig, AppEnvironment, MarketplaceConfig};
use coderr::error::AppError;
use coderr::marketplace::{InMemoryMarketplaceRepository, MarketplaceService};
use coderr::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub(crate) type Marketplace = MarketplaceService<InMemoryMarketplaceRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads configuration, applies a snapshot override and starts tracing.
pub(crate) fn bootstrap(data_file: Option<PathBuf>) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(path) = data_file {
        config.marketplace.data_file = Some(path);
    }
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

/// Builds the service over the configured snapshot, or a purely in-memory store.
pub(crate) fn open_marketplace(config: &MarketplaceConfig) -> Result<Arc<Marketplace>, AppError> {
    let repository = match &config.data_file {
        Some(path) => {
            info!(path = %path.display(), "loading marketplace snapshot");
            InMemoryMarketplaceRepository::with_snapshot(path)?
        }
        None => {
            warn!("no data file configured, marketplace data lives in memory only");
            InMemoryMarketplaceRepository::new()
        }
    };
    Ok(Arc::new(MarketplaceService::new(
        Arc::new(repository),
        config.clone(),
    )))
}

/// Explicit origins win; without any, development is permissive and other
/// environments allow no cross-origin calls.
pub(crate) fn cors_layer(environment: AppEnvironment, origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return if environment == AppEnvironment::Development {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        };
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderr::marketplace::MarketplaceRepository;

    #[test]
    fn open_marketplace_without_data_file_starts_empty() {
        let service = open_marketplace(&MarketplaceConfig::default()).expect("service opens");
        let users = service
            .repository()
            .read(|data| data.users().count())
            .expect("read succeeds");
        assert_eq!(users, 0);
        assert!(service.repository().snapshot_path().is_none());
    }

    #[test]
    fn open_marketplace_attaches_the_snapshot() {
        let path = std::env::temp_dir().join("coderr-api-infra-missing-snapshot.json");
        let config = MarketplaceConfig {
            data_file: Some(path.clone()),
            ..MarketplaceConfig::default()
        };
        let service = open_marketplace(&config).expect("service opens");
        assert_eq!(service.repository().snapshot_path(), Some(path.as_path()));
    }
}
