use pkg_constants::state::IPADDRESSES_PREFIX;
use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddressSpec {
    /// Provider the address is requested for.
    #[serde(default)]
    pub provider: String,
    /// Tag of the controller instance that requested it.
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddressStatus {
    /// Empty until the allocator assigns an address.
    #[serde(default)]
    pub address: String,
}

/// Address allocation request and result, named after its Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddress {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: IpAddressSpec,
    #[serde(default)]
    pub status: IpAddressStatus,
}

impl IpAddress {
    pub fn is_assigned(&self) -> bool {
        !self.status.address.is_empty()
    }
}

impl Resource for IpAddress {
    const KIND: &'static str = "IpAddress";
    const PREFIX: &'static str = IPADDRESSES_PREFIX;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
