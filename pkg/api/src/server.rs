use axum::{Router, middleware, routing::get};
use pkg_types::configmap::ConfigMap;
use pkg_types::event::ClusterEvent;
use pkg_types::ipaddress::IpAddress;
use pkg_types::service::Service;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::AppState;
use crate::handlers::{health, resources, watch as watch_handler};
use crate::request_id::request_id_middleware;

/// Server configuration passed from the binary's CLI.
pub struct ServerConfig {
    pub addr: SocketAddr,
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/v1/watch", get(watch_handler::watch_events))
        .route(
            "/api/v1/namespaces/{ns}/services",
            get(resources::list::<Service>),
        )
        .route(
            "/api/v1/namespaces/{ns}/services/{name}",
            get(resources::get::<Service>)
                .put(resources::put::<Service>)
                .delete(resources::delete::<Service>),
        )
        .route(
            "/api/v1/namespaces/{ns}/ipaddresses",
            get(resources::list::<IpAddress>),
        )
        .route(
            "/api/v1/namespaces/{ns}/ipaddresses/{name}",
            get(resources::get::<IpAddress>)
                .put(resources::put::<IpAddress>)
                .delete(resources::delete::<IpAddress>),
        )
        .route(
            "/api/v1/namespaces/{ns}/configmaps",
            get(resources::list::<ConfigMap>),
        )
        .route(
            "/api/v1/namespaces/{ns}/configmaps/{name}",
            get(resources::get::<ConfigMap>)
                .put(resources::put::<ConfigMap>)
                .delete(resources::delete::<ConfigMap>),
        )
        .route(
            "/api/v1/namespaces/{ns}/events",
            get(resources::list::<ClusterEvent>),
        )
        .layer(middleware::from_fn(request_id_middleware));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/metrics", get(health::metrics))
        .merge(api_routes)
        .with_state(state)
}

/// Serve the API until `shutdown` flips to true.
pub async fn start_server(
    config: ServerConfig,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = router(state);

    info!("Starting API server on {}", config.addr);
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    info!("API server stopped");
    Ok(())
}
