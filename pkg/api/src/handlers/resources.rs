//! CRUD endpoints shared by every stored kind.
//!
//! Handlers are generic over [`Resource`] and instantiated per kind in the
//! router, e.g. `get(resources::list::<Service>)`.

use axum::{
    Json,
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pkg_state::RegistryError;
use pkg_types::Resource;
use tracing::{info, warn};

use crate::AppState;

fn error_response(err: RegistryError) -> Response {
    let status = match &err {
        RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
        RegistryError::AlreadyExists { .. } | RegistryError::Conflict { .. } => {
            StatusCode::CONFLICT
        }
        RegistryError::Codec { .. } | RegistryError::Store(_) => {
            warn!("Registry error: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string()).into_response()
}

pub async fn list<T: Resource>(
    State(state): State<AppState>,
    AxumPath(ns): AxumPath<String>,
) -> Response {
    match state.registry.list::<T>(Some(&ns)).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get<T: Resource>(
    State(state): State<AppState>,
    AxumPath((ns, name)): AxumPath<(String, String)>,
) -> Response {
    match state.registry.get::<T>(&ns, &name).await {
        Ok(Some(obj)) => (StatusCode::OK, Json(obj)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            format!("{} {}/{} not found", T::KIND, ns, name),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT creates the object when its resource version is zero and otherwise
/// updates it, rejecting stale versions with 409.
pub async fn put<T: Resource>(
    State(state): State<AppState>,
    AxumPath((ns, name)): AxumPath<(String, String)>,
    Json(mut obj): Json<T>,
) -> Response {
    let meta = obj.metadata_mut();
    if meta.namespace.is_empty() {
        meta.namespace = ns.clone();
    }
    if meta.name.is_empty() {
        meta.name = name.clone();
    }
    if meta.namespace != ns || meta.name != name {
        return (
            StatusCode::BAD_REQUEST,
            format!(
                "body names {}/{} but path names {}/{}",
                meta.namespace, meta.name, ns, name
            ),
        )
            .into_response();
    }
    if let Err(e) = obj.validate() {
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }

    if obj.metadata().resource_version == 0 {
        match state.registry.create(obj).await {
            Ok(created) => {
                info!("Created {} {}/{}", T::KIND, ns, name);
                (StatusCode::CREATED, Json(created)).into_response()
            }
            Err(e) => error_response(e),
        }
    } else {
        match state.registry.update(obj).await {
            Ok(updated) => {
                info!(
                    "Updated {} {}/{} to version {}",
                    T::KIND,
                    ns,
                    name,
                    updated.metadata().resource_version
                );
                (StatusCode::OK, Json(updated)).into_response()
            }
            Err(e) => error_response(e),
        }
    }
}

pub async fn delete<T: Resource>(
    State(state): State<AppState>,
    AxumPath((ns, name)): AxumPath<(String, String)>,
) -> Response {
    match state.registry.delete::<T>(&ns, &name).await {
        Ok(()) => {
            info!("Deleted {} {}/{}", T::KIND, ns, name);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_metrics::MetricsRegistry;
    use pkg_state::{Registry, StateStore};
    use pkg_types::service::{Service, ServicePort};
    use std::sync::Arc;

    async fn state() -> AppState {
        AppState {
            registry: Registry::new(StateStore::in_memory().await.unwrap()),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    fn path(ns: &str, name: &str) -> AxumPath<(String, String)> {
        AxumPath((ns.to_string(), name.to_string()))
    }

    fn web() -> Service {
        Service::new("default", "web", vec![ServicePort::tcp(80)])
    }

    #[tokio::test]
    async fn put_creates_then_updates_with_version_check() {
        let state = state().await;

        let resp = put::<Service>(State(state.clone()), path("default", "web"), Json(web())).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let mut stored: Service = state
            .registry
            .get("default", "web")
            .await
            .unwrap()
            .unwrap();
        stored.spec.ports.push(ServicePort::tcp(443));
        let resp = put::<Service>(
            State(state.clone()),
            path("default", "web"),
            Json(stored.clone()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        // same version again is now stale
        let resp = put::<Service>(State(state.clone()), path("default", "web"), Json(stored)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = put::<Service>(State(state), path("default", "web"), Json(web())).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn put_rejects_mismatched_or_invalid_names() {
        let state = state().await;
        let resp = put::<Service>(State(state.clone()), path("default", "api"), Json(web())).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bad = Service::new("default", "9web", vec![]);
        let resp = put::<Service>(State(state), path("default", "9web"), Json(bad)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_and_delete_report_missing_objects() {
        let state = state().await;
        let resp = get::<Service>(State(state.clone()), path("default", "web")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        state.registry.create(web()).await.unwrap();
        let resp = delete::<Service>(State(state.clone()), path("default", "web")).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = delete::<Service>(State(state), path("default", "web")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn records_of_the_longest_service_name_accept_status_writes() {
        use pkg_types::configmap::ConfigMap;
        use pkg_types::validate::MAX_SERVICE_NAME_LEN;

        let state = state().await;
        let longest = format!("s{}", "a".repeat(MAX_SERVICE_NAME_LEN - 1));
        let too_long = format!("{}a", longest);

        let svc = Service::new("default", &too_long, vec![ServicePort::tcp(80)]);
        let resp = put::<Service>(State(state.clone()), path("default", &too_long), Json(svc)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let svc = Service::new("default", &longest, vec![ServicePort::tcp(80)]);
        let resp = put::<Service>(State(state.clone()), path("default", &longest), Json(svc)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let record_name = format!("bigip-{}-65535", longest);
        let mut record = state
            .registry
            .create(ConfigMap {
                metadata: pkg_types::ObjectMeta::new("default", &record_name),
                data: Default::default(),
            })
            .await
            .unwrap();
        record.metadata.annotations.insert(
            "status.virtual-server.f5.com/ip".to_string(),
            "10.0.0.1".to_string(),
        );
        let resp = put::<ConfigMap>(State(state), path("default", &record_name), Json(record)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
