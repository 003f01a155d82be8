//! Observed vs. desired record comparison.

use pkg_constants::record::{RECORD_LABEL_KEY, RECORD_LABEL_VALUE};
use pkg_types::annotation::VipAnnotation;
use pkg_types::configmap::ConfigMap;
use pkg_types::service::Service;

#[derive(Debug, Clone)]
pub struct RecordDiff {
    /// Payload matches and the load balancer reports the assigned VIP.
    pub up_to_date: bool,
    /// Content this controller owns differs, so the record must be written.
    pub needs_write: bool,
    /// Update payload, versioned against the observed record.
    pub desired: ConfigMap,
    /// Why the record is not up to date. Empty when it is.
    pub reason: String,
}

/// Compare the record we want with the record we found.
///
/// The status VIP is written by the load-balancer controller, so a mismatch
/// there makes the record stale without requiring a write of our own: if the
/// requested VIP already matches we are simply waiting for the device.
pub fn diff_record(service: &Service, observed: &ConfigMap, mut desired: ConfigMap) -> RecordDiff {
    let assigned = VipAnnotation::AssignedVip.get(&service.metadata);
    let status = VipAnnotation::RecordStatusVip.get(&observed.metadata);
    let mut reasons = Vec::new();

    let payload_changed = observed.data != desired.data;
    if payload_changed {
        reasons.push("virtual server config changed".to_string());
    }
    if status != assigned {
        reasons.push(format!("vip changes from '{}' to '{}'", status, assigned));
    }

    let requested_changed = VipAnnotation::RecordRequestedVip.get(&observed.metadata)
        != VipAnnotation::RecordRequestedVip.get(&desired.metadata);
    let needs_write = payload_changed
        || requested_changed
        || observed.metadata.label(RECORD_LABEL_KEY) != RECORD_LABEL_VALUE
        || observed.metadata.owner_references != desired.metadata.owner_references;

    desired.metadata.uid = observed.metadata.uid.clone();
    desired.metadata.resource_version = observed.metadata.resource_version;
    // Labels and annotations set by others ride along untouched.
    for (key, value) in &observed.metadata.labels {
        desired
            .metadata
            .labels
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    for (key, value) in &observed.metadata.annotations {
        if key != VipAnnotation::RecordStatusVip.key() {
            desired
                .metadata
                .annotations
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
    if !requested_changed && !status.is_empty() {
        // Same VIP: the device keeps serving it through a config update.
        VipAnnotation::RecordStatusVip.set(&mut desired.metadata, status);
    }

    RecordDiff {
        up_to_date: reasons.is_empty(),
        needs_write,
        desired,
        reason: reasons.join(", "),
    }
}
