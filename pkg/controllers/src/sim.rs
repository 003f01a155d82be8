//! Stand-ins for the external allocator and load-balancer controller.

use pkg_state::Registry;
use pkg_types::annotation::VipAnnotation;
use pkg_types::configmap::ConfigMap;
use pkg_types::ipaddress::IpAddress;

/// Assign `10.0.0.<n>` to every allocation that has no address yet.
pub async fn sim_ipam(registry: &Registry) -> anyhow::Result<Vec<String>> {
    let mut assigned = Vec::new();
    let mut taken: Vec<IpAddress> = registry.list(None).await?;
    let mut next = taken.iter().filter(|a| a.is_assigned()).count() + 1;
    for addr in taken.iter_mut().filter(|a| !a.is_assigned()) {
        addr.status.address = format!("10.0.0.{}", next);
        next += 1;
        assigned.push(addr.status.address.clone());
        registry.update(addr.clone()).await?;
    }
    Ok(assigned)
}

/// Report every record's requested VIP as programmed.
pub async fn sim_bigip(registry: &Registry) -> anyhow::Result<usize> {
    let mut programmed = 0;
    let records: Vec<ConfigMap> = registry.list(None).await?;
    for mut record in records {
        let requested = VipAnnotation::RecordRequestedVip
            .get(&record.metadata)
            .to_string();
        if requested.is_empty() {
            continue;
        }
        if VipAnnotation::RecordStatusVip.set(&mut record.metadata, &requested) {
            registry.update(record).await?;
            programmed += 1;
        }
    }
    Ok(programmed)
}
