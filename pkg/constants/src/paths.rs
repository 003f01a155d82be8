//! Filesystem path constants.

/// Default config file path.
pub const DEFAULT_CONFIG: &str = "/etc/bigip-ipam/config.yaml";

/// Default data directory for the state store.
pub const DEFAULT_DATA_DIR: &str = "/tmp/bigip-ipam-data";
