//! Address allocation through the IPAM resources.

use async_trait::async_trait;
use pkg_constants::annotations::{PROVIDER_BIGIP, VIP_PROVIDER, VIP_TAG};
use pkg_state::{Registry, RegistryError};
use pkg_types::annotation::VipAnnotation;
use pkg_types::ipaddress::{IpAddress, IpAddressSpec, IpAddressStatus};
use pkg_types::meta::ObjectMeta;
use pkg_types::service::{Service, ServiceType};
use tracing::{debug, info};

use crate::builder::owner_reference;

/// Result of [`AllocationGateway::ensure_vip`].
#[derive(Debug, Clone)]
pub struct VipLease {
    /// An address is assigned and recorded on `service`.
    pub has_address: bool,
    /// `service` was changed and must be persisted by the caller.
    pub needs_update: bool,
    pub service: Service,
}

#[async_trait]
pub trait AllocationGateway: Send + Sync {
    /// Request an address for `service` if it has none and report whether one
    /// is available. Never persists the Service itself.
    async fn ensure_vip(&self, service: &Service) -> anyhow::Result<VipLease>;
}

/// Gateway that requests addresses by creating `IpAddress` objects for the
/// external allocator to fill in.
pub struct IpamGateway {
    registry: Registry,
    tag: String,
    require_tag: bool,
}

impl IpamGateway {
    pub fn new(registry: Registry, tag: impl Into<String>, require_tag: bool) -> Self {
        Self {
            registry,
            tag: tag.into(),
            require_tag,
        }
    }

    /// ClusterIP Services cannot be reached from the load balancer; other
    /// providers and, when required, untagged Services are not ours.
    fn is_eligible(&self, service: &Service) -> bool {
        if service.spec.service_type == ServiceType::ClusterIP {
            return false;
        }
        let provider = service.metadata.annotation(VIP_PROVIDER);
        if !provider.is_empty() && provider != PROVIDER_BIGIP {
            return false;
        }
        !self.require_tag || service.metadata.annotation(VIP_TAG) == self.tag
    }

    fn request_for(&self, service: &Service) -> IpAddress {
        let mut metadata = ObjectMeta::new(&service.metadata.namespace, &service.metadata.name);
        metadata.owner_references.push(owner_reference(service));
        IpAddress {
            metadata,
            spec: IpAddressSpec {
                provider: PROVIDER_BIGIP.to_string(),
                tag: self.tag.clone(),
            },
            status: IpAddressStatus::default(),
        }
    }
}

#[async_trait]
impl AllocationGateway for IpamGateway {
    async fn ensure_vip(&self, service: &Service) -> anyhow::Result<VipLease> {
        let mut service = service.clone();
        if !self.is_eligible(&service) {
            debug!(
                "Service {} is not handled by this controller",
                service.metadata.key()
            );
            return Ok(VipLease {
                has_address: false,
                needs_update: false,
                service,
            });
        }

        let ns = service.metadata.namespace.clone();
        let name = service.metadata.name.clone();
        let mut changed = VipAnnotation::VipRequested.set(&mut service.metadata, "true");

        let Some(address) = self.registry.get::<IpAddress>(&ns, &name).await? else {
            match self.registry.create(self.request_for(&service)).await {
                Ok(_) => info!("Requested an address for service {}/{}", ns, name),
                Err(RegistryError::AlreadyExists { .. }) => {}
                Err(e) => return Err(e.into()),
            }
            // A previous allocation is gone; its address must not be reused.
            changed |= VipAnnotation::AssignedVip.clear(&mut service.metadata);
            return Ok(VipLease {
                has_address: false,
                needs_update: changed,
                service,
            });
        };

        if !address.is_assigned() {
            debug!("Waiting for an address for service {}/{}", ns, name);
            return Ok(VipLease {
                has_address: false,
                needs_update: changed,
                service,
            });
        }

        if VipAnnotation::AssignedVip.set(&mut service.metadata, &address.status.address) {
            info!(
                "Service {}/{} was assigned address {}",
                ns, name, address.status.address
            );
            changed = true;
        }
        Ok(VipLease {
            has_address: true,
            needs_update: changed,
            service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_state::StateStore;
    use pkg_types::service::ServicePort;

    async fn gateway(require_tag: bool) -> (Registry, IpamGateway) {
        let registry = Registry::new(StateStore::in_memory().await.unwrap());
        let gw = IpamGateway::new(registry.clone(), "cluster-a", require_tag);
        (registry, gw)
    }

    fn web() -> Service {
        Service::new("default", "web", vec![ServicePort::tcp(80)])
    }

    #[tokio::test]
    async fn first_call_requests_an_address() {
        let (registry, gw) = gateway(false).await;
        let lease = gw.ensure_vip(&web()).await.unwrap();
        assert!(!lease.has_address);
        assert!(lease.needs_update);
        assert_eq!(VipAnnotation::VipRequested.get(&lease.service.metadata), "true");

        let request: IpAddress = registry.get("default", "web").await.unwrap().unwrap();
        assert_eq!(request.spec.provider, "bigip");
        assert_eq!(request.spec.tag, "cluster-a");
        assert!(request.metadata.is_owned_by("Service", "v1", "web"));
    }

    #[tokio::test]
    async fn assigned_address_is_copied_once() {
        let (registry, gw) = gateway(false).await;
        let lease = gw.ensure_vip(&web()).await.unwrap();

        let mut addr: IpAddress = registry.get("default", "web").await.unwrap().unwrap();
        addr.status.address = "10.0.0.9".to_string();
        registry.update(addr).await.unwrap();

        let lease = gw.ensure_vip(&lease.service).await.unwrap();
        assert!(lease.has_address);
        assert!(lease.needs_update);
        assert_eq!(
            VipAnnotation::AssignedVip.get(&lease.service.metadata),
            "10.0.0.9"
        );

        let again = gw.ensure_vip(&lease.service).await.unwrap();
        assert!(again.has_address);
        assert!(!again.needs_update);
    }

    #[tokio::test]
    async fn ineligible_services_are_left_alone() {
        let (registry, gw) = gateway(true).await;

        let untagged = gw.ensure_vip(&web()).await.unwrap();
        assert!(!untagged.has_address && !untagged.needs_update);

        let mut cluster_ip = web();
        cluster_ip.spec.service_type = ServiceType::ClusterIP;
        cluster_ip
            .metadata
            .annotations
            .insert(VIP_TAG.to_string(), "cluster-a".to_string());
        assert!(!gw.ensure_vip(&cluster_ip).await.unwrap().needs_update);

        let mut foreign = web();
        foreign
            .metadata
            .annotations
            .insert(VIP_TAG.to_string(), "cluster-a".to_string());
        foreign
            .metadata
            .annotations
            .insert(VIP_PROVIDER.to_string(), "haproxy".to_string());
        assert!(!gw.ensure_vip(&foreign).await.unwrap().needs_update);

        let all: Vec<IpAddress> = registry.list(None).await.unwrap();
        assert!(all.is_empty());
    }
}
