pub mod api;
pub mod chain;
pub mod config;
pub mod errors;
pub mod execution;
pub mod health;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod polymarket;
pub mod services;
pub mod store;

use crate::health::HealthState;

#[derive(Clone)]
pub struct AppState {
    pub health: HealthState,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    /// Seconds without a successful tick before `/health` reports 503.
    pub stale_secs: u64,
}
