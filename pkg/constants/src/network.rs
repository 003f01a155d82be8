//! Network-related constants.

/// Default port for the health, metrics and resource API.
pub const DEFAULT_API_PORT: u16 = 8080;
