//! Environment variables and their defaults.

/// Load-balancer partition the virtual servers are created in.
pub const ENV_PARTITION: &str = "F5_PARTITION";

/// Tag identifying this controller instance.
pub const ENV_CONTROLLER_TAG: &str = "CONTROLLER_TAG";

/// Any non-empty value restricts the controller to tagged Services.
pub const ENV_REQUIRE_TAG: &str = "REQUIRE_TAG";

/// Log level (`error`, `warn`, `info`, `debug`, `trace`).
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// State store directory.
pub const ENV_DATA_DIR: &str = "BIGIP_IPAM_DATA_DIR";

pub const DEFAULT_PARTITION: &str = "kubernetes";

pub const DEFAULT_CONTROLLER_TAG: &str = "kubernetes";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Number of reconcile workers.
pub const DEFAULT_WORKERS: usize = 2;

/// Seconds between full resyncs of every Service.
pub const DEFAULT_RESYNC_SECS: u64 = 300;
