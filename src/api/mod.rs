//! API module
//!
//! HTTP API endpoints, shared state and middleware.

pub mod auth;
pub mod avarias;
pub mod checkins;
pub mod extract;
pub mod gps;
pub mod middleware;
pub mod ordens;
pub mod routes;

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::history::{HistoryStore, PgHistoryStore};
use crate::service_record::{PgServiceStore, ServiceStore};

pub use routes::{create_router, public_router};

/// Runtime knobs the handlers need
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Lifetime of a login session
    pub session_ttl: chrono::Duration,
    /// GPS positions older than this are hidden from route queries
    pub gps_stale_after: chrono::Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            session_ttl: chrono::Duration::hours(24),
            gps_stale_after: chrono::Duration::seconds(300),
        }
    }
}

impl From<&Config> for ApiSettings {
    fn from(config: &Config) -> Self {
        Self {
            session_ttl: chrono::Duration::hours(config.session_ttl_hours),
            gps_stale_after: config.gps_stale_after,
        }
    }
}

/// State shared by every route
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: PgPool,
    pub services: Arc<dyn ServiceStore>,
    pub history: Arc<dyn HistoryStore>,
    pub settings: ApiSettings,
}

impl AppState {
    /// State with PostgreSQL-backed stores
    pub fn postgres(pool: PgPool, settings: ApiSettings) -> Self {
        Self {
            services: Arc::new(PgServiceStore::new(pool.clone())),
            history: Arc::new(PgHistoryStore::new(pool.clone())),
            pool,
            settings,
        }
    }

    /// State with injected stores; the pool still serves the other routes
    pub fn with_stores(
        pool: PgPool,
        services: Arc<dyn ServiceStore>,
        history: Arc<dyn HistoryStore>,
        settings: ApiSettings,
    ) -> Self {
        Self {
            pool,
            services,
            history,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_settings_default() {
        let settings = ApiSettings::default();
        assert_eq!(settings.session_ttl, chrono::Duration::hours(24));
        assert_eq!(settings.gps_stale_after, chrono::Duration::minutes(5));
    }
}
