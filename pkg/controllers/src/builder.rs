//! Desired virtual-server configuration for a Service port.
//!
//! Everything here is a pure function of the Service and the partition; the
//! serialized payload must come out byte-identical for identical inputs or
//! the diff would never settle.

use anyhow::Context;
use pkg_constants::annotations::{SSL_PROFILES, VIP_MODE};
use pkg_constants::record::{
    DATA_CONFIG_KEY, DATA_SCHEMA_KEY, DEFAULT_BALANCE, HTTP_FRONTEND_PORT, HTTPS_FRONTEND_PORT,
    OWNER_API_VERSION, OWNER_KIND, RECORD_LABEL_KEY, RECORD_LABEL_VALUE, VIRTUAL_SERVER_SCHEMA,
};
use pkg_types::annotation::VipAnnotation;
use pkg_types::configmap::ConfigMap;
use pkg_types::meta::{ObjectMeta, OwnerReference};
use pkg_types::service::Service;
use pkg_types::validate::validate_name;
use pkg_types::virtual_server::{
    Backend, Frontend, SslProfile, VirtualAddress, VirtualServer, VirtualServerConfig,
    VirtualServerMode,
};
use std::collections::HashMap;

use crate::naming::record_name;

/// Mode and SSL selection read from a Service's annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VipSettings {
    pub mode: VirtualServerMode,
    pub ssl: bool,
}

impl VipSettings {
    pub fn from_service(service: &Service) -> Self {
        Self {
            mode: VirtualServerMode::from_annotation(service.metadata.annotation(VIP_MODE)),
            ssl: !service.metadata.annotation(SSL_PROFILES).is_empty(),
        }
    }

    /// In tcp mode the frontend listens on the service port. In http mode it
    /// listens on 443 with SSL and 80 without, whatever the service port is.
    pub fn frontend_port(&self, service_port: u16) -> u16 {
        match self.mode {
            VirtualServerMode::Tcp => service_port,
            VirtualServerMode::Http if self.ssl => HTTPS_FRONTEND_PORT,
            VirtualServerMode::Http => HTTP_FRONTEND_PORT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    partition: String,
}

impl ConfigBuilder {
    pub fn new(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
        }
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn config_for(
        &self,
        service: &Service,
        settings: VipSettings,
        service_port: u16,
    ) -> VirtualServerConfig {
        let ssl_profile = settings
            .ssl
            .then(|| ssl_profile(service.metadata.annotation(SSL_PROFILES)));

        VirtualServerConfig {
            virtual_server: VirtualServer {
                frontend: Frontend {
                    balance: DEFAULT_BALANCE.to_string(),
                    mode: settings.mode,
                    partition: self.partition.clone(),
                    virtual_address: VirtualAddress {
                        bind_addr: None,
                        port: settings.frontend_port(service_port),
                    },
                    ssl_profile,
                },
                backend: Backend {
                    service_name: service.metadata.name.clone(),
                    service_port,
                },
            },
        }
    }

    /// The record the load-balancer controller should see for `service_port`.
    pub fn record_for(
        &self,
        service: &Service,
        settings: VipSettings,
        service_port: u16,
    ) -> anyhow::Result<ConfigMap> {
        let config = self.config_for(service, settings, service_port);
        let payload = serde_json::to_string(&config)?;
        let frontend_port = config.virtual_server.frontend.virtual_address.port;

        let name = record_name(&service.metadata.name, frontend_port);
        validate_name(&name).with_context(|| {
            format!(
                "service {} cannot be published as a record",
                service.metadata.key()
            )
        })?;

        let mut metadata = ObjectMeta::new(&service.metadata.namespace, &name);
        metadata.labels.insert(
            RECORD_LABEL_KEY.to_string(),
            RECORD_LABEL_VALUE.to_string(),
        );
        metadata.annotations.insert(
            VipAnnotation::RecordRequestedVip.key().to_string(),
            VipAnnotation::AssignedVip.get(&service.metadata).to_string(),
        );
        metadata.owner_references.push(owner_reference(service));

        Ok(ConfigMap {
            metadata,
            data: HashMap::from([
                (DATA_SCHEMA_KEY.to_string(), VIRTUAL_SERVER_SCHEMA.to_string()),
                (DATA_CONFIG_KEY.to_string(), payload),
            ]),
        })
    }
}

/// Owner reference pointing back at `service`.
pub fn owner_reference(service: &Service) -> OwnerReference {
    OwnerReference {
        kind: OWNER_KIND.to_string(),
        api_version: OWNER_API_VERSION.to_string(),
        name: service.metadata.name.clone(),
        uid: service.metadata.uid.clone(),
    }
}

/// A single profile keeps the singular field so its payload stays stable.
fn ssl_profile(annotation: &str) -> SslProfile {
    let names: Vec<&str> = annotation.split(',').collect();
    if names.len() == 1 {
        SslProfile {
            profile_name: Some(annotation.to_string()),
            profile_names: Vec::new(),
        }
    } else {
        SslProfile {
            profile_name: None,
            profile_names: names.into_iter().map(str::to_string).collect(),
        }
    }
}
