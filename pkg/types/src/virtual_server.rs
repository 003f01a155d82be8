//! Virtual-server configuration as read by the load-balancer controller.
//!
//! Field order and names are part of the wire format: the serialized form is
//! compared byte for byte to decide whether a record is stale.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VirtualServerMode {
    Http,
    #[default]
    Tcp,
}

impl VirtualServerMode {
    /// `http` selects http mode, anything else (including unset) is tcp.
    pub fn from_annotation(value: &str) -> Self {
        if value == "http" {
            VirtualServerMode::Http
        } else {
            VirtualServerMode::Tcp
        }
    }
}

impl std::fmt::Display for VirtualServerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VirtualServerMode::Http => write!(f, "http"),
            VirtualServerMode::Tcp => write!(f, "tcp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    pub service_name: String,
    pub service_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<String>,
    pub port: u16,
}

/// One profile goes in `f5ProfileName`, several in `f5ProfileNames`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslProfile {
    #[serde(
        rename = "f5ProfileName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_name: Option<String>,
    #[serde(
        rename = "f5ProfileNames",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub profile_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontend {
    pub balance: String,
    pub mode: VirtualServerMode,
    pub partition: String,
    pub virtual_address: VirtualAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_profile: Option<SslProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualServer {
    pub frontend: Frontend,
    pub backend: Backend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerConfig {
    pub virtual_server: VirtualServer,
}
