use clap::Parser;
use pkg_api::AppState;
use pkg_api::server::{ServerConfig, start_server};
use pkg_constants::env::{
    DEFAULT_CONTROLLER_TAG, DEFAULT_LOG_LEVEL, DEFAULT_PARTITION, DEFAULT_RESYNC_SECS,
    DEFAULT_WORKERS, ENV_CONTROLLER_TAG, ENV_DATA_DIR, ENV_LOG_LEVEL, ENV_PARTITION,
    ENV_REQUIRE_TAG,
};
use pkg_constants::network::DEFAULT_API_PORT;
use pkg_constants::paths::{DEFAULT_CONFIG, DEFAULT_DATA_DIR};
use pkg_controllers::gateway::IpamGateway;
use pkg_controllers::runtime::ControllerRuntime;
use pkg_controllers::vip::{VipController, VipControllerConfig};
use pkg_metrics::MetricsRegistry;
use pkg_state::{Registry, StateStore};
use pkg_types::config::{ControllerConfigFile, load_config_file};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

#[derive(Parser, Debug, Default)]
#[command(
    name = "bigip-ipam",
    about = "Creates BIG-IP virtual-server records for Services with IPAM-assigned addresses"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Partition the virtual servers are created in
    #[arg(long, env = ENV_PARTITION)]
    partition: Option<String>,

    /// Tag identifying this controller instance
    #[arg(long, env = ENV_CONTROLLER_TAG)]
    controller_tag: Option<String>,

    /// Any non-empty value only handles Services tagged for this controller
    #[arg(long, env = ENV_REQUIRE_TAG)]
    require_tag: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = ENV_LOG_LEVEL)]
    log_level: Option<String>,

    /// Directory for SlateDB state storage
    #[arg(long, env = ENV_DATA_DIR)]
    data_dir: Option<String>,

    /// Number of reconcile workers
    #[arg(long)]
    workers: Option<usize>,

    /// Port for the HTTP API
    #[arg(long)]
    api_port: Option<u16>,

    /// Seconds between full resyncs
    #[arg(long)]
    resync_secs: Option<u64>,
}

/// Effective settings after merging CLI args > config file > defaults.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    partition: String,
    controller_tag: String,
    require_tag: bool,
    log_level: String,
    /// Set when the requested level was not recognized.
    rejected_log_level: Option<String>,
    data_dir: String,
    workers: usize,
    api_port: u16,
    resync: Duration,
}

impl Settings {
    fn resolve(cli: Cli, file: ControllerConfigFile) -> Self {
        let requested_level = cli
            .log_level
            .or(file.log_level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
            .to_ascii_lowercase();
        let (log_level, rejected_log_level) = if LOG_LEVELS.contains(&requested_level.as_str()) {
            (requested_level, None)
        } else {
            ("warn".to_string(), Some(requested_level))
        };

        Self {
            partition: cli
                .partition
                .or(file.partition)
                .unwrap_or_else(|| DEFAULT_PARTITION.to_string()),
            controller_tag: cli
                .controller_tag
                .or(file.controller_tag)
                .unwrap_or_else(|| DEFAULT_CONTROLLER_TAG.to_string()),
            require_tag: cli
                .require_tag
                .map(|v| !v.is_empty())
                .or(file.require_tag)
                .unwrap_or(false),
            log_level,
            rejected_log_level,
            data_dir: cli
                .data_dir
                .or(file.data_dir)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            workers: cli.workers.or(file.workers).unwrap_or(DEFAULT_WORKERS),
            api_port: cli.api_port.or(file.api_port).unwrap_or(DEFAULT_API_PORT),
            resync: Duration::from_secs(
                cli.resync_secs
                    .or(file.resync_secs)
                    .unwrap_or(DEFAULT_RESYNC_SECS),
            ),
        }
    }
}

async fn wait_for_signal(tx: watch::Sender<bool>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
    let _ = tx.send(true);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let config_path = cli.config.clone();
    let file_cfg: ControllerConfigFile = load_config_file(&config_path)?;
    let settings = Settings::resolve(cli, file_cfg);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_level))
        .init();
    if let Some(level) = &settings.rejected_log_level {
        warn!("Unknown log level '{}', using 'warn'", level);
    }

    info!("Starting bigip-ipam");
    info!("  Config file:    {}", config_path);
    info!("  Partition:      {}", settings.partition);
    info!("  Controller tag: {}", settings.controller_tag);
    info!("  Require tag:    {}", settings.require_tag);
    info!("  Data dir:       {}", settings.data_dir);
    info!("  Workers:        {}", settings.workers);
    info!("  API port:       {}", settings.api_port);

    let store = StateStore::new(&settings.data_dir).await?;
    let registry = Registry::new(store.clone());
    let metrics = Arc::new(MetricsRegistry::new());

    let gateway = Arc::new(IpamGateway::new(
        registry.clone(),
        settings.controller_tag.clone(),
        settings.require_tag,
    ));
    let controller = VipController::new(
        registry.clone(),
        gateway,
        VipControllerConfig {
            partition: settings.partition.clone(),
        },
        metrics.clone(),
    );
    let runtime = ControllerRuntime::new(controller, metrics.clone(), settings.resync);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_signal(shutdown_tx));

    let api = tokio::spawn(start_server(
        ServerConfig {
            addr: SocketAddr::from(([0, 0, 0, 0], settings.api_port)),
        },
        AppState {
            registry,
            metrics,
        },
        shutdown_rx.clone(),
    ));

    runtime.run(settings.workers, shutdown_rx).await?;
    if let Err(e) = api.await? {
        warn!("API server failed: {}", e);
    }

    store.close().await?;
    info!("bigip-ipam stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_cli_or_file() {
        let s = Settings::resolve(Cli::default(), ControllerConfigFile::default());
        assert_eq!(s.partition, "kubernetes");
        assert_eq!(s.controller_tag, "kubernetes");
        assert!(!s.require_tag);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.workers, DEFAULT_WORKERS);
        assert_eq!(s.resync, Duration::from_secs(DEFAULT_RESYNC_SECS));
    }

    #[test]
    fn cli_wins_over_file() {
        let cli = Cli {
            partition: Some("prod".to_string()),
            ..Default::default()
        };
        let file = ControllerConfigFile {
            partition: Some("staging".to_string()),
            controller_tag: Some("cluster-a".to_string()),
            ..Default::default()
        };
        let s = Settings::resolve(cli, file);
        assert_eq!(s.partition, "prod");
        assert_eq!(s.controller_tag, "cluster-a");
    }

    #[test]
    fn any_non_empty_require_tag_enables_it() {
        for (value, expected) in [("1", true), ("false", true), ("", false)] {
            let cli = Cli {
                require_tag: Some(value.to_string()),
                ..Default::default()
            };
            let file = ControllerConfigFile {
                require_tag: Some(true),
                ..Default::default()
            };
            assert_eq!(Settings::resolve(cli, file).require_tag, expected);
        }
    }

    #[test]
    fn unknown_log_level_falls_back_to_warn() {
        let cli = Cli {
            log_level: Some("chatty".to_string()),
            ..Default::default()
        };
        let s = Settings::resolve(cli, ControllerConfigFile::default());
        assert_eq!(s.log_level, "warn");
        assert_eq!(s.rejected_log_level.as_deref(), Some("chatty"));

        let cli = Cli {
            log_level: Some("DEBUG".to_string()),
            ..Default::default()
        };
        assert_eq!(
            Settings::resolve(cli, ControllerConfigFile::default()).log_level,
            "debug"
        );
    }
}
