use pkg_constants::state::SERVICES_PREFIX;
use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};
use crate::validate::{validate_name, validate_service_name};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    ClusterIP,
    #[default]
    NodePort,
    LoadBalancer,
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceType::ClusterIP => write!(f, "ClusterIP"),
            ServiceType::NodePort => write!(f, "NodePort"),
            ServiceType::LoadBalancer => write!(f, "LoadBalancer"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Sctp => write!(f, "SCTP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub protocol: Protocol,
    pub port: u16,
    #[serde(default)]
    pub node_port: Option<u16>,
}

impl ServicePort {
    pub fn tcp(port: u16) -> Self {
        Self {
            name: String::new(),
            protocol: Protocol::Tcp,
            port,
            node_port: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default)]
    pub service_type: ServiceType,
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

impl Service {
    pub fn new(namespace: &str, name: &str, ports: Vec<ServicePort>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: ServiceSpec {
                service_type: ServiceType::NodePort,
                ports,
            },
        }
    }

    /// Ports exposed through a virtual server. UDP is never load balanced here.
    pub fn wanted_ports(&self) -> impl Iterator<Item = &ServicePort> {
        self.spec
            .ports
            .iter()
            .filter(|p| p.protocol != Protocol::Udp)
    }
}

impl Resource for Service {
    const KIND: &'static str = "Service";
    const PREFIX: &'static str = SERVICES_PREFIX;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    /// Record names embed the Service name, so it must be a DNS-1035 label.
    fn validate(&self) -> anyhow::Result<()> {
        validate_name(&self.metadata.namespace)?;
        validate_service_name(&self.metadata.name)
    }
}
