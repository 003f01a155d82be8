use pkg_constants::record::{RECORD_LABEL_KEY, RECORD_LABEL_VALUE};
use pkg_constants::state::CONFIGMAPS_PREFIX;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::meta::{ObjectMeta, Resource};

/// Key/value object. Virtual-server records are ConfigMaps carrying the
/// `f5type=virtual-server` label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMap {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl ConfigMap {
    pub fn is_virtual_server(&self) -> bool {
        self.metadata.label(RECORD_LABEL_KEY) == RECORD_LABEL_VALUE
    }

    pub fn data_value(&self, key: &str) -> &str {
        self.data.get(key).map(String::as_str).unwrap_or("")
    }
}

impl Resource for ConfigMap {
    const KIND: &'static str = "ConfigMap";
    const PREFIX: &'static str = CONFIGMAPS_PREFIX;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
