use serde::{Deserialize, Serialize};

/// Controller configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// partition: kubernetes
/// controller-tag: cluster-a
/// require-tag: true
/// data-dir: /var/lib/bigip-ipam
/// log-level: debug
/// workers: 4
/// api-port: 8080
/// resync-secs: 300
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfigFile {
    #[serde(default)]
    pub partition: Option<String>,
    #[serde(default, alias = "controller-tag")]
    pub controller_tag: Option<String>,
    #[serde(default, alias = "require-tag")]
    pub require_tag: Option<bool>,
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    #[serde(default, alias = "log-level")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default, alias = "api-port")]
    pub api_port: Option<u16>,
    #[serde(default, alias = "resync-secs")]
    pub resync_secs: Option<u64>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg: ControllerConfigFile =
            load_config_file("/nonexistent/bigip-ipam/config.yaml").unwrap();
        assert!(cfg.partition.is_none());
        assert!(cfg.require_tag.is_none());
    }

    #[test]
    fn kebab_case_keys_are_accepted() {
        let cfg: ControllerConfigFile = serde_yaml::from_str(
            "partition: prod\ncontroller-tag: cluster-a\nrequire-tag: true\nworkers: 4\n",
        )
        .unwrap();
        assert_eq!(cfg.partition.as_deref(), Some("prod"));
        assert_eq!(cfg.controller_tag.as_deref(), Some("cluster-a"));
        assert_eq!(cfg.require_tag, Some(true));
        assert_eq!(cfg.workers, Some(4));
    }
}
