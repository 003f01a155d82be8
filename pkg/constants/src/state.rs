//! State store key layout.

/// Registry prefix for Services: `/registry/services/<ns>/<name>`.
pub const SERVICES_PREFIX: &str = "/registry/services/";

/// Registry prefix for address allocations.
pub const IPADDRESSES_PREFIX: &str = "/registry/ipaddresses/";

/// Registry prefix for ConfigMaps (virtual-server records).
pub const CONFIGMAPS_PREFIX: &str = "/registry/configmaps/";

/// Registry prefix for cluster events.
pub const EVENTS_PREFIX: &str = "/registry/events/";

/// Number of recent watch events kept for replay.
pub const EVENT_LOG_CAPACITY: usize = 1024;
