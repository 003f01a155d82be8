//! Removal of virtual-server records for ports a Service no longer exposes.

use pkg_metrics::{MALFORMED_RECORDS_TOTAL, MetricsRegistry, RECORDS_DELETED_TOTAL};
use pkg_state::{Registry, RegistryError};
use pkg_types::configmap::ConfigMap;
use pkg_types::meta::ObjectMeta;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::naming::RecordName;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Names of the records that were deleted.
    pub deleted: Vec<String>,
    /// Labelled records whose name did not parse.
    pub malformed: usize,
}

pub struct OrphanSweeper {
    registry: Registry,
    metrics: Arc<MetricsRegistry>,
}

impl OrphanSweeper {
    pub fn new(registry: Registry, metrics: Arc<MetricsRegistry>) -> Self {
        Self { registry, metrics }
    }

    /// Delete every record of `service` whose frontend port is not in `wanted`.
    ///
    /// Ownership is decided by name only, so records survive here exactly as
    /// long as their name maps back to this Service and a wanted port.
    pub async fn sweep(
        &self,
        service: &ObjectMeta,
        wanted: &BTreeSet<u16>,
    ) -> anyhow::Result<SweepOutcome> {
        let mut outcome = SweepOutcome::default();
        let records: Vec<ConfigMap> = self.registry.list(Some(&service.namespace)).await?;

        for record in records.into_iter().filter(ConfigMap::is_virtual_server) {
            let Some(parsed) = RecordName::parse(&record.metadata.name) else {
                warn!(
                    "Ignoring virtual-server record {} with unexpected name",
                    record.metadata.key()
                );
                self.metrics.counter_inc(MALFORMED_RECORDS_TOTAL);
                outcome.malformed += 1;
                continue;
            };
            if parsed.service != service.name || wanted.contains(&parsed.frontend_port) {
                continue;
            }

            info!("Deleting obsolete record {}", record.metadata.key());
            match self
                .registry
                .delete::<ConfigMap>(&record.metadata.namespace, &record.metadata.name)
                .await
            {
                Ok(()) | Err(RegistryError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
            self.metrics.counter_inc(RECORDS_DELETED_TOTAL);
            outcome.deleted.push(record.metadata.name);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_constants::record::{RECORD_LABEL_KEY, RECORD_LABEL_VALUE};
    use pkg_state::StateStore;
    use std::collections::HashMap;

    fn record(namespace: &str, name: &str, labelled: bool) -> ConfigMap {
        let mut metadata = ObjectMeta::new(namespace, name);
        if labelled {
            metadata.labels.insert(
                RECORD_LABEL_KEY.to_string(),
                RECORD_LABEL_VALUE.to_string(),
            );
        }
        ConfigMap {
            metadata,
            data: HashMap::new(),
        }
    }

    async fn names(registry: &Registry, namespace: &str) -> Vec<String> {
        let mut names: Vec<String> = registry
            .list::<ConfigMap>(Some(namespace))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.metadata.name)
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn deletes_only_unwanted_records_of_this_service() {
        let registry = Registry::new(StateStore::in_memory().await.unwrap());
        let metrics = Arc::new(MetricsRegistry::new());
        for r in [
            record("default", "bigip-web-80", true),
            record("default", "bigip-web-443", true),
            record("default", "bigip-web-80-8080", true),
            record("default", "bigip-other-80", true),
            record("default", "bigip-web-9090", false),
            record("default", "bigip-web-http", true),
            record("prod", "bigip-web-80", true),
        ] {
            registry.create(r).await.unwrap();
        }

        let sweeper = OrphanSweeper::new(registry.clone(), metrics.clone());
        let outcome = sweeper
            .sweep(&ObjectMeta::new("default", "web"), &BTreeSet::from([443]))
            .await
            .unwrap();

        assert_eq!(outcome.deleted, vec!["bigip-web-80".to_string()]);
        assert_eq!(outcome.malformed, 1);
        assert_eq!(metrics.counter(RECORDS_DELETED_TOTAL), 1);
        assert_eq!(
            names(&registry, "default").await,
            vec![
                "bigip-other-80",
                "bigip-web-443",
                "bigip-web-80-8080",
                "bigip-web-9090",
                "bigip-web-http"
            ]
        );
        assert_eq!(names(&registry, "prod").await, vec!["bigip-web-80"]);
    }
}
