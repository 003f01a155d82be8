pub mod handlers;
pub mod request_id;
pub mod server;

use std::sync::Arc;

use pkg_metrics::MetricsRegistry;
use pkg_state::Registry;

/// Shared application state injected into all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub metrics: Arc<MetricsRegistry>,
}
