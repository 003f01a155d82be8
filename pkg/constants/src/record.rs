//! Virtual-server record layout consumed by the load-balancer controller.

/// Prefix of every record name: `<prefix>-<service>-<frontend port>`.
pub const RECORD_PREFIX: &str = "bigip";

/// Separator between the name segments.
pub const RECORD_SEPARATOR: char = '-';

/// Label key marking a ConfigMap as a virtual-server record.
pub const RECORD_LABEL_KEY: &str = "f5type";

/// Label value marking a ConfigMap as a virtual-server record.
pub const RECORD_LABEL_VALUE: &str = "virtual-server";

/// Data key holding the schema identifier.
pub const DATA_SCHEMA_KEY: &str = "schema";

/// Data key holding the serialized virtual-server configuration.
pub const DATA_CONFIG_KEY: &str = "data";

/// Schema identifier understood by the load-balancer controller.
pub const VIRTUAL_SERVER_SCHEMA: &str = "f5schemadb://bigip-virtual-server_v0.1.3.json";

/// Balancing policy of every frontend.
pub const DEFAULT_BALANCE: &str = "round-robin";

/// Frontend port in http mode without SSL.
pub const HTTP_FRONTEND_PORT: u16 = 80;

/// Frontend port in http mode with SSL.
pub const HTTPS_FRONTEND_PORT: u16 = 443;

/// Owner reference kind for records and allocations.
pub const OWNER_KIND: &str = "Service";

/// Owner reference API version for records and allocations.
pub const OWNER_API_VERSION: &str = "v1";
