//! Typed resource access with optimistic concurrency.
//!
//! Every stored object carries a `resource_version`. An update must present
//! the version it read; if another writer got there first the update fails
//! with [`RegistryError::Conflict`] and the caller re-reads and retries.

use chrono::Utc;
use pkg_types::meta::{Resource, registry_key};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::StateStore;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("conflict writing {kind} {key}: stored version {stored}, given {given}")]
    Conflict {
        kind: &'static str,
        key: String,
        stored: u64,
        given: u64,
    },

    #[error("failed to decode {key}: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RegistryError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Typed view over a [`StateStore`].
///
/// Clones share one write lock, so every writer in the process must go
/// through clones of the same `Registry`.
#[derive(Clone)]
pub struct Registry {
    store: StateStore,
    write_lock: Arc<Mutex<()>>,
}

impl Registry {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub async fn get<T: Resource>(&self, namespace: &str, name: &str) -> Result<Option<T>> {
        let key = registry_key::<T>(namespace, name);
        self.read(&key).await
    }

    /// List objects of kind `T`, in one namespace or across all of them.
    /// Entries that fail to decode are skipped.
    pub async fn list<T: Resource>(&self, namespace: Option<&str>) -> Result<Vec<T>> {
        let prefix = match namespace {
            Some(ns) => format!("{}{}/", T::PREFIX, ns),
            None => T::PREFIX.to_string(),
        };
        let entries = self.store.list_prefix(&prefix).await?;
        let mut out = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match serde_json::from_slice::<T>(&value) {
                Ok(obj) => out.push(obj),
                Err(e) => warn!("Skipping undecodable {} at {}: {}", T::KIND, key, e),
            }
        }
        Ok(out)
    }

    /// Store a new object. Assigns uid and the first resource version.
    pub async fn create<T: Resource>(&self, mut obj: T) -> Result<T> {
        let key = obj.registry_key();
        let _guard = self.write_lock.lock().await;
        if self.store.get(&key).await?.is_some() {
            return Err(RegistryError::AlreadyExists { kind: T::KIND, key });
        }
        let meta = obj.metadata_mut();
        if meta.uid.is_empty() {
            meta.uid = Uuid::new_v4().to_string();
        }
        meta.resource_version = 1;
        meta.created_at = Some(Utc::now());
        self.write(&key, &obj).await?;
        debug!("Created {} {}", T::KIND, key);
        Ok(obj)
    }

    /// Replace an existing object. `obj` must carry the version it was read at.
    pub async fn update<T: Resource>(&self, mut obj: T) -> Result<T> {
        let key = obj.registry_key();
        let _guard = self.write_lock.lock().await;
        let current: T = self
            .read(&key)
            .await?
            .ok_or_else(|| RegistryError::NotFound {
                kind: T::KIND,
                key: key.clone(),
            })?;
        let stored = current.metadata().resource_version;
        let given = obj.metadata().resource_version;
        if stored != given {
            return Err(RegistryError::Conflict {
                kind: T::KIND,
                key,
                stored,
                given,
            });
        }
        let meta = obj.metadata_mut();
        meta.uid = current.metadata().uid.clone();
        meta.created_at = current.metadata().created_at;
        meta.resource_version = stored + 1;
        self.write(&key, &obj).await?;
        debug!("Updated {} {} to version {}", T::KIND, key, stored + 1);
        Ok(obj)
    }

    /// Create `obj` or overwrite whatever is stored, ignoring versions.
    pub async fn apply<T: Resource>(&self, mut obj: T) -> Result<T> {
        let key = obj.registry_key();
        let _guard = self.write_lock.lock().await;
        let current: Option<T> = self.read(&key).await?;
        let meta = obj.metadata_mut();
        match current {
            Some(current) => {
                meta.uid = current.metadata().uid.clone();
                meta.created_at = current.metadata().created_at;
                meta.resource_version = current.metadata().resource_version + 1;
            }
            None => {
                if meta.uid.is_empty() {
                    meta.uid = Uuid::new_v4().to_string();
                }
                meta.created_at = Some(Utc::now());
                meta.resource_version = 1;
            }
        }
        self.write(&key, &obj).await?;
        Ok(obj)
    }

    pub async fn delete<T: Resource>(&self, namespace: &str, name: &str) -> Result<()> {
        let key = registry_key::<T>(namespace, name);
        let _guard = self.write_lock.lock().await;
        if self.store.get(&key).await?.is_none() {
            return Err(RegistryError::NotFound { kind: T::KIND, key });
        }
        self.store.delete(&key).await?;
        debug!("Deleted {} {}", T::KIND, key);
        Ok(())
    }

    async fn read<T: Resource>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| RegistryError::Codec {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn write<T: Resource>(&self, key: &str, obj: &T) -> Result<()> {
        let data = serde_json::to_vec(obj).map_err(|source| RegistryError::Codec {
            key: key.to_string(),
            source,
        })?;
        self.store.put(key, &data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_types::service::{Service, ServicePort};

    async fn registry() -> Registry {
        Registry::new(StateStore::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn create_assigns_uid_and_version() {
        let reg = registry().await;
        let svc = reg
            .create(Service::new("default", "web", vec![ServicePort::tcp(80)]))
            .await
            .unwrap();
        assert!(!svc.metadata.uid.is_empty());
        assert_eq!(svc.metadata.resource_version, 1);

        let err = reg
            .create(Service::new("default", "web", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let reg = registry().await;
        let first = reg
            .create(Service::new("default", "web", vec![ServicePort::tcp(80)]))
            .await
            .unwrap();
        let stale = first.clone();

        let mut fresh = first;
        fresh.spec.ports.push(ServicePort::tcp(443));
        let fresh = reg.update(fresh).await.unwrap();
        assert_eq!(fresh.metadata.resource_version, 2);

        let err = reg.update(stale).await.unwrap_err();
        assert!(err.is_conflict());

        let stored: Service = reg.get("default", "web").await.unwrap().unwrap();
        assert_eq!(stored.spec.ports.len(), 2);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_object_is_not_found() {
        let reg = registry().await;
        let err = reg
            .update(Service::new("default", "ghost", vec![]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let err = reg.delete::<Service>("default", "ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_is_scoped_to_namespace() {
        let reg = registry().await;
        reg.create(Service::new("default", "a", vec![])).await.unwrap();
        reg.create(Service::new("default", "b", vec![])).await.unwrap();
        reg.create(Service::new("prod", "a", vec![])).await.unwrap();

        let default: Vec<Service> = reg.list(Some("default")).await.unwrap();
        assert_eq!(default.len(), 2);
        let all: Vec<Service> = reg.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn apply_overwrites_without_version_check() {
        let reg = registry().await;
        let created = reg.create(Service::new("default", "web", vec![])).await.unwrap();
        let mut blind = Service::new("default", "web", vec![ServicePort::tcp(8080)]);
        blind.metadata.resource_version = 0;
        let applied = reg.apply(blind).await.unwrap();
        assert_eq!(applied.metadata.resource_version, 2);
        assert_eq!(applied.metadata.uid, created.metadata.uid);
    }
}
