//! Annotation keys shared between this controller, the IPAM allocator and
//! the load-balancer controller.

// ─── Written by this controller ───────────────────────────────────────────

/// Set on a Service once an address allocation has been requested for it.
pub const VIP_REQUESTED: &str = "nexinto.com/vip-requested";

/// The VIP that is live on the load balancer for every wanted port.
pub const ACTIVE_VIP: &str = "nexinto.com/vip";

/// The VIP a virtual-server record asks the load-balancer controller to program.
pub const RECORD_REQUESTED_VIP: &str = "virtual-server.f5.com/ip";

// ─── Written by collaborators ─────────────────────────────────────────────

/// The address assigned by the allocator, copied from the allocation status.
pub const ASSIGNED_VIP: &str = "nexinto.com/assigned-vip";

/// Set by the load-balancer controller once the device serves the VIP.
pub const RECORD_STATUS_VIP: &str = "status.virtual-server.f5.com/ip";

// ─── Written by users ─────────────────────────────────────────────────────

/// Comma separated list of SSL profiles for the virtual server.
pub const SSL_PROFILES: &str = "nexinto.com/vip-ssl-profiles";

/// Virtual server mode, `http` or `tcp`.
pub const VIP_MODE: &str = "nexinto.com/req-vip-mode";

/// Selects the VIP provider. Services naming another provider are ignored.
pub const VIP_PROVIDER: &str = "nexinto.com/vip-provider";

/// Controller tag a Service must carry when the tag requirement is enabled.
pub const VIP_TAG: &str = "nexinto.com/vip-tag";

/// The provider name this controller answers to.
pub const PROVIDER_BIGIP: &str = "bigip";
