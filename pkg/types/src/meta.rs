use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reference from a dependent object to the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub kind: String,
    pub api_version: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

/// Metadata common to every stored resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    /// Assigned by the registry on create.
    #[serde(default)]
    pub uid: String,
    /// Bumped by the registry on every write. Zero means "never stored".
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    /// `<namespace>/<name>`, the key the work queue and the registry use.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Annotation value, or the empty string when unset.
    pub fn annotation(&self, key: &str) -> &str {
        self.annotations.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map(String::as_str).unwrap_or("")
    }

    /// True if some owner reference points at `kind`/`name`.
    pub fn is_owned_by(&self, kind: &str, api_version: &str, name: &str) -> bool {
        self.owner_references
            .iter()
            .any(|r| r.kind == kind && r.api_version == api_version && r.name == name)
    }
}

/// A namespaced object kept in the registry.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Kind name used in logs and owner references.
    const KIND: &'static str;

    /// Registry key prefix, ending in `/`.
    const PREFIX: &'static str;

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn registry_key(&self) -> String {
        registry_key::<Self>(&self.metadata().namespace, &self.metadata().name)
    }

    /// Reject objects whose name or namespace cannot be stored.
    fn validate(&self) -> anyhow::Result<()> {
        crate::validate::validate_name(&self.metadata().namespace)?;
        crate::validate::validate_name(&self.metadata().name)
    }
}

/// Registry key of the object `namespace/name` of kind `T`.
pub fn registry_key<T: Resource>(namespace: &str, name: &str) -> String {
    format!("{}{}/{}", T::PREFIX, namespace, name)
}

/// Splits `<namespace>/<name>` into its two parts.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    match key.split_once('/') {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
            Some((ns, name))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_key_accepts_namespace_and_name() {
        assert_eq!(split_key("default/web"), Some(("default", "web")));
        assert_eq!(split_key("default"), None);
        assert_eq!(split_key("/web"), None);
        assert_eq!(split_key("a/b/c"), None);
    }

    #[test]
    fn missing_annotation_reads_as_empty() {
        let mut meta = ObjectMeta::new("default", "web");
        assert_eq!(meta.annotation("x"), "");
        meta.annotations.insert("x".into(), "1".into());
        assert_eq!(meta.annotation("x"), "1");
    }
}
