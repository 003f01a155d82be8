//! The annotation protocol shared by the three parties.
//!
//! There is no RPC between this controller, the IPAM allocator and the
//! load-balancer controller. Each writes its own annotations and reads the
//! others'. The happy path is:
//!
//! 1. the controller marks the Service [`VipAnnotation::VipRequested`] and
//!    creates an address allocation;
//! 2. the allocator fills in the address, which lands in
//!    [`VipAnnotation::AssignedVip`];
//! 3. the controller writes one record per port carrying
//!    [`VipAnnotation::RecordRequestedVip`];
//! 4. the load-balancer controller programs the device and answers with
//!    [`VipAnnotation::RecordStatusVip`];
//! 5. once every wanted record reports the assigned VIP the controller
//!    promotes it to [`VipAnnotation::ActiveVip`].
//!
//! A later change of the assigned VIP restarts at step 3. The active VIP only
//! ever moves forward.

use pkg_constants::annotations;

use crate::meta::ObjectMeta;

/// Party allowed to write an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Writer {
    /// This controller.
    Controller,
    /// The address allocator, through the allocation gateway.
    Allocator,
    /// The external load-balancer controller.
    LoadBalancer,
}

/// Object kind an annotation lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    Service,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VipAnnotation {
    VipRequested,
    AssignedVip,
    ActiveVip,
    RecordRequestedVip,
    RecordStatusVip,
}

impl VipAnnotation {
    pub const ALL: [VipAnnotation; 5] = [
        VipAnnotation::VipRequested,
        VipAnnotation::AssignedVip,
        VipAnnotation::ActiveVip,
        VipAnnotation::RecordRequestedVip,
        VipAnnotation::RecordStatusVip,
    ];

    pub fn key(self) -> &'static str {
        match self {
            VipAnnotation::VipRequested => annotations::VIP_REQUESTED,
            VipAnnotation::AssignedVip => annotations::ASSIGNED_VIP,
            VipAnnotation::ActiveVip => annotations::ACTIVE_VIP,
            VipAnnotation::RecordRequestedVip => annotations::RECORD_REQUESTED_VIP,
            VipAnnotation::RecordStatusVip => annotations::RECORD_STATUS_VIP,
        }
    }

    pub fn writer(self) -> Writer {
        match self {
            VipAnnotation::VipRequested
            | VipAnnotation::ActiveVip
            | VipAnnotation::RecordRequestedVip => Writer::Controller,
            VipAnnotation::AssignedVip => Writer::Allocator,
            VipAnnotation::RecordStatusVip => Writer::LoadBalancer,
        }
    }

    pub fn carrier(self) -> Carrier {
        match self {
            VipAnnotation::VipRequested | VipAnnotation::AssignedVip | VipAnnotation::ActiveVip => {
                Carrier::Service
            }
            VipAnnotation::RecordRequestedVip | VipAnnotation::RecordStatusVip => Carrier::Record,
        }
    }

    /// Value on `meta`, empty when unset.
    pub fn get(self, meta: &ObjectMeta) -> &str {
        meta.annotation(self.key())
    }

    /// Sets the value. Returns true if it changed.
    pub fn set(self, meta: &mut ObjectMeta, value: &str) -> bool {
        if self.get(meta) == value {
            return false;
        }
        meta.annotations
            .insert(self.key().to_string(), value.to_string());
        true
    }

    /// Removes the value. Returns true if it was present.
    pub fn clear(self, meta: &mut ObjectMeta) -> bool {
        meta.annotations.remove(self.key()).is_some()
    }
}

impl std::fmt::Display for VipAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct() {
        let mut keys: Vec<&str> = VipAnnotation::ALL.iter().map(|a| a.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), VipAnnotation::ALL.len());
    }

    #[test]
    fn controller_owns_request_active_and_record_vip() {
        let owned: Vec<VipAnnotation> = VipAnnotation::ALL
            .into_iter()
            .filter(|a| a.writer() == Writer::Controller)
            .collect();
        assert_eq!(
            owned,
            vec![
                VipAnnotation::VipRequested,
                VipAnnotation::ActiveVip,
                VipAnnotation::RecordRequestedVip
            ]
        );
        assert_eq!(VipAnnotation::RecordStatusVip.carrier(), Carrier::Record);
    }

    #[test]
    fn set_reports_changes_only() {
        let mut meta = ObjectMeta::new("default", "web");
        assert!(VipAnnotation::ActiveVip.set(&mut meta, "10.0.0.1"));
        assert!(!VipAnnotation::ActiveVip.set(&mut meta, "10.0.0.1"));
        assert_eq!(VipAnnotation::ActiveVip.get(&meta), "10.0.0.1");
        assert!(VipAnnotation::ActiveVip.clear(&mut meta));
        assert!(!VipAnnotation::ActiveVip.clear(&mut meta));
    }
}
