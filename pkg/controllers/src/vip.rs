use pkg_constants::record::{OWNER_API_VERSION, OWNER_KIND};
use pkg_metrics::{
    MetricsRegistry, RECORDS_CREATED_TOTAL, RECORDS_DELETED_TOTAL, RECORDS_UPDATED_TOTAL,
    VIPS_ACTIVATED_TOTAL,
};
use pkg_state::{Registry, RegistryError};
use pkg_types::annotation::VipAnnotation;
use pkg_types::configmap::ConfigMap;
use pkg_types::event::ClusterEvent;
use pkg_types::ipaddress::IpAddress;
use pkg_types::meta::split_key;
use pkg_types::service::Service;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::builder::{ConfigBuilder, VipSettings};
use crate::diff::diff_record;
use crate::gateway::AllocationGateway;
use crate::sweep::OrphanSweeper;

/// Settings taken from the environment.
#[derive(Debug, Clone)]
pub struct VipControllerConfig {
    /// Load-balancer partition for every virtual server.
    pub partition: String,
}

/// What a reconcile pass ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The key was not a `<namespace>/<name>` pair.
    Ignored,
    /// No address is assigned yet, or the Service is not ours.
    Waiting,
    /// Records are written but not all of them are programmed.
    Progressing { active: usize, wanted: usize },
    /// Every wanted record serves the assigned VIP.
    Ready { wanted: usize },
    /// The Service is gone and its leftovers were removed.
    Deleted { records: usize },
}

/// Reconciles one Service into its virtual-server records.
///
/// Each pass re-reads everything it needs, so it can run any number of times
/// in any order relative to the allocator and the load-balancer controller.
/// The work queue guarantees a key is never reconciled concurrently.
pub struct VipController {
    registry: Registry,
    gateway: Arc<dyn AllocationGateway>,
    builder: ConfigBuilder,
    sweeper: OrphanSweeper,
    metrics: Arc<MetricsRegistry>,
}

impl VipController {
    pub fn new(
        registry: Registry,
        gateway: Arc<dyn AllocationGateway>,
        config: VipControllerConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            sweeper: OrphanSweeper::new(registry.clone(), metrics.clone()),
            builder: ConfigBuilder::new(config.partition),
            registry,
            gateway,
            metrics,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn reconcile(&self, key: &str) -> anyhow::Result<ReconcileOutcome> {
        let Some((ns, name)) = split_key(key) else {
            warn!("Ignoring malformed service key '{}'", key);
            return Ok(ReconcileOutcome::Ignored);
        };
        debug!("Processing service {}", key);

        let Some(service) = self.registry.get::<Service>(ns, name).await? else {
            return self.collect_garbage(ns, name).await;
        };

        let lease = self.gateway.ensure_vip(&service).await?;
        if !lease.has_address {
            if lease.needs_update {
                self.registry.update(lease.service).await?;
            }
            return Ok(ReconcileOutcome::Waiting);
        }
        let mut service = lease.service;
        let mut needs_update = lease.needs_update;

        let settings = VipSettings::from_service(&service);
        let assigned = VipAnnotation::AssignedVip.get(&service.metadata).to_string();

        // frontend port -> service port; the first port claiming a frontend wins
        let mut wanted: BTreeMap<u16, u16> = BTreeMap::new();
        for port in service.wanted_ports() {
            let frontend = settings.frontend_port(port.port);
            if let Some(owner) = wanted.get(&frontend) {
                warn!(
                    "Service {}: port {} shares frontend port {} with port {}, skipping it",
                    key, port.port, frontend, owner
                );
                continue;
            }
            wanted.insert(frontend, port.port);
        }

        let mut active = 0;
        for &service_port in wanted.values() {
            if self.ensure_record(&service, settings, service_port).await? == assigned {
                active += 1;
            }
        }

        if active == wanted.len() && VipAnnotation::ActiveVip.get(&service.metadata) != assigned {
            info!(
                "Loadbalancing for service {} is now ready with {} service port(s) on virtual IP '{}'",
                key,
                wanted.len(),
                assigned
            );
            VipAnnotation::ActiveVip.set(&mut service.metadata, &assigned);
            service = self.registry.update(service).await?;
            needs_update = false;
            self.metrics.counter_inc(VIPS_ACTIVATED_TOTAL);
            self.notify_ready(&service, &assigned, wanted.len()).await;
        }

        let wanted_ports: BTreeSet<u16> = wanted.keys().copied().collect();
        self.sweeper.sweep(&service.metadata, &wanted_ports).await?;

        if needs_update {
            self.registry.update(service).await?;
        }

        if active == wanted.len() {
            Ok(ReconcileOutcome::Ready {
                wanted: wanted.len(),
            })
        } else {
            Ok(ReconcileOutcome::Progressing {
                active,
                wanted: wanted.len(),
            })
        }
    }

    /// Create or update the record for `service_port` and return the VIP
    /// the load-balancer controller reports for it.
    async fn ensure_record(
        &self,
        service: &Service,
        settings: VipSettings,
        service_port: u16,
    ) -> anyhow::Result<String> {
        let desired = self.builder.record_for(service, settings, service_port)?;
        let ns = &service.metadata.namespace;

        let Some(observed) = self
            .registry
            .get::<ConfigMap>(ns, &desired.metadata.name)
            .await?
        else {
            let created = self.registry.create(desired).await?;
            self.metrics.counter_inc(RECORDS_CREATED_TOTAL);
            info!(
                "Created record {} for service {} port {}",
                created.metadata.key(),
                service.metadata.key(),
                service_port
            );
            return Ok(String::new());
        };

        let diff = diff_record(service, &observed, desired);
        let current = if diff.needs_write {
            info!(
                "Updating record {} ({})",
                observed.metadata.key(),
                diff.reason
            );
            let updated = self.registry.update(diff.desired).await?;
            self.metrics.counter_inc(RECORDS_UPDATED_TOTAL);
            updated
        } else {
            if !diff.up_to_date {
                debug!(
                    "Record {} is waiting for the load balancer ({})",
                    observed.metadata.key(),
                    diff.reason
                );
            }
            observed
        };
        Ok(VipAnnotation::RecordStatusVip
            .get(&current.metadata)
            .to_string())
    }

    /// Remove the records, the allocation and the events of a Service that no
    /// longer exists.
    async fn collect_garbage(&self, ns: &str, name: &str) -> anyhow::Result<ReconcileOutcome> {
        let mut records = 0;
        let owned: Vec<ConfigMap> = self.registry.list(Some(ns)).await?;
        for record in owned.into_iter().filter(|r| {
            r.is_virtual_server() && r.metadata.is_owned_by(OWNER_KIND, OWNER_API_VERSION, name)
        }) {
            info!(
                "Deleting record {} of deleted service {}/{}",
                record.metadata.key(),
                ns,
                name
            );
            ignore_not_found(
                self.registry
                    .delete::<ConfigMap>(ns, &record.metadata.name)
                    .await,
            )?;
            self.metrics.counter_inc(RECORDS_DELETED_TOTAL);
            records += 1;
        }

        if let Some(address) = self.registry.get::<IpAddress>(ns, name).await?
            && address
                .metadata
                .is_owned_by(OWNER_KIND, OWNER_API_VERSION, name)
        {
            info!("Releasing address allocation of deleted service {}/{}", ns, name);
            ignore_not_found(self.registry.delete::<IpAddress>(ns, name).await)?;
        }

        let events: Vec<ClusterEvent> = self.registry.list(Some(ns)).await?;
        for event in events
            .into_iter()
            .filter(|e| e.involved_kind == OWNER_KIND && e.involved_name == name)
        {
            debug!("Deleting event {}", event.metadata.key());
            ignore_not_found(
                self.registry
                    .delete::<ClusterEvent>(ns, &event.metadata.name)
                    .await,
            )?;
        }

        Ok(ReconcileOutcome::Deleted { records })
    }

    /// Readiness is only reported; failing to record it is not a reconcile error.
    async fn notify_ready(&self, service: &Service, vip: &str, ports: usize) {
        let event = ClusterEvent::normal(
            &service.metadata,
            OWNER_KIND,
            "VipReady",
            format!(
                "Loadbalancing with virtual IP '{}' is ready with {} service port(s)",
                vip, ports
            ),
        );
        if let Err(e) = self.registry.create(event).await {
            warn!(
                "Failed to record readiness event for {}: {}",
                service.metadata.key(),
                e
            );
        }
    }
}

fn ignore_not_found(result: Result<(), RegistryError>) -> Result<(), RegistryError> {
    match result {
        Err(RegistryError::NotFound { .. }) => Ok(()),
        other => other,
    }
}
