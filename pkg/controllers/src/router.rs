//! Maps store changes to the Service keys that must be reconciled.

use pkg_constants::record::{OWNER_API_VERSION, OWNER_KIND};
use pkg_constants::state::{CONFIGMAPS_PREFIX, IPADDRESSES_PREFIX, SERVICES_PREFIX};
use pkg_state::{EventType, Registry, WatchEvent};
use pkg_types::annotation::VipAnnotation;
use pkg_types::configmap::ConfigMap;
use pkg_types::ipaddress::IpAddress;
use pkg_types::meta::{ObjectMeta, split_key};
use pkg_types::service::Service;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, info, warn};

use crate::naming::RecordName;
use crate::queue::WorkQueue;

pub struct EventRouter {
    registry: Registry,
    queue: WorkQueue<String>,
    resync_interval: Duration,
}

impl EventRouter {
    pub fn new(registry: Registry, queue: WorkQueue<String>, resync_interval: Duration) -> Self {
        Self {
            registry,
            queue,
            resync_interval,
        }
    }

    /// Enqueue every Service, plus the owners of records and allocations so
    /// leftovers of Services deleted while we were not watching get cleaned up.
    pub async fn resync(&self) -> anyhow::Result<usize> {
        let mut keys = BTreeSet::new();
        for svc in self.registry.list::<Service>(None).await? {
            keys.insert(svc.metadata.key());
        }
        for record in self.registry.list::<ConfigMap>(None).await? {
            if record.is_virtual_server() {
                keys.extend(owner_keys(&record.metadata));
            }
        }
        for address in self.registry.list::<IpAddress>(None).await? {
            keys.extend(owner_keys(&address.metadata));
        }

        let count = keys.len();
        for key in keys {
            self.queue.add(key);
        }
        debug!("Resync enqueued {} service key(s)", count);
        Ok(count)
    }

    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            // Subscribe before listing so no change falls between the two.
            let mut events = BroadcastStream::new(self.registry.store().event_log.subscribe());
            if let Err(e) = self.resync().await {
                warn!("Initial resync failed: {}", e);
            }
            info!(
                "EventRouter started (resync={}s)",
                self.resync_interval.as_secs()
            );

            let mut ticker = tokio::time::interval(self.resync_interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.resync().await {
                            warn!("Periodic resync failed: {}", e);
                        }
                    }
                    item = events.next() => match item {
                        Some(Ok(event)) => {
                            for key in keys_for(&event) {
                                self.queue.add(key);
                            }
                        }
                        Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                            warn!("Watch stream lagged by {} event(s), resyncing", missed);
                            if let Err(e) = self.resync().await {
                                warn!("Resync after lag failed: {}", e);
                            }
                        }
                        None => break,
                    }
                }
            }
            info!("EventRouter stopped");
        })
    }
}

/// Service keys affected by one store change.
pub fn keys_for(event: &WatchEvent) -> Vec<String> {
    if let Some(rest) = event.key.strip_prefix(SERVICES_PREFIX) {
        return valid_key(rest).into_iter().collect();
    }
    // An allocation is named after its Service.
    if let Some(rest) = event.key.strip_prefix(IPADDRESSES_PREFIX) {
        return valid_key(rest).into_iter().collect();
    }
    let Some(rest) = event.key.strip_prefix(CONFIGMAPS_PREFIX) else {
        return Vec::new();
    };
    let Some((ns, name)) = split_key(rest) else {
        return Vec::new();
    };

    match (event.event_type, event.value.as_deref()) {
        (EventType::Put, Some(value)) => {
            let Ok(record) = serde_json::from_slice::<ConfigMap>(value) else {
                return Vec::new();
            };
            // Only a status report from the load balancer is news to us.
            if !record.is_virtual_server()
                || VipAnnotation::RecordStatusVip
                    .get(&record.metadata)
                    .is_empty()
            {
                return Vec::new();
            }
            let owners = owner_keys(&record.metadata);
            if owners.is_empty() {
                return key_from_record_name(ns, name).into_iter().collect();
            }
            owners
        }
        (EventType::Delete, _) => key_from_record_name(ns, name).into_iter().collect(),
        (EventType::Put, None) => Vec::new(),
    }
}

fn valid_key(rest: &str) -> Option<String> {
    split_key(rest).map(|(ns, name)| format!("{}/{}", ns, name))
}

fn key_from_record_name(ns: &str, name: &str) -> Option<String> {
    RecordName::parse(name).map(|r| format!("{}/{}", ns, r.service))
}

fn owner_keys(meta: &ObjectMeta) -> Vec<String> {
    meta.owner_references
        .iter()
        .filter(|r| r.kind == OWNER_KIND && r.api_version == OWNER_API_VERSION)
        .map(|r| format!("{}/{}", meta.namespace, r.name))
        .collect()
}
