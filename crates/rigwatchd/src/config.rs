//! TOML configuration for the daemon
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 3000
//!
//! [diagnostics]
//! device_id = "komatsu"
//! snapshot_interval_secs = 10
//! store_timeout_ms = 2000
//! history_limit = 200
//! max_devices = 1000
//! # rules = "rules/pc200.yaml"
//!
//! [forecast]
//! url = "http://127.0.0.1:5005/predict"
//! timeout_ms = 5000
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::Context;
use rigwatch_engine::{EngineConfig, ForecastConfig};
use serde::Deserialize;

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub diagnostics: EngineConfig,
    pub forecast: ForecastConfig,
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.server.addr().port(), 3000);
        assert_eq!(config.diagnostics.device_id, "komatsu");
        assert_eq!(config.forecast.url, None);
    }

    #[test]
    fn test_load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind = "127.0.0.1"
port = 8088

[diagnostics]
device_id = "pc200-07"
snapshot_interval_secs = 30
max_devices = 50
rules = "/etc/rigwatch/pc200.yaml"

[forecast]
url = "http://127.0.0.1:5005/predict"
"#
        )
        .unwrap();

        let config = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(config.server.addr(), "127.0.0.1:8088".parse().unwrap());
        assert_eq!(config.diagnostics.device_id, "pc200-07");
        assert_eq!(config.diagnostics.snapshot_interval_secs, 30);
        assert_eq!(config.diagnostics.store_timeout_ms, 2000);
        assert_eq!(config.diagnostics.max_devices, 50);
        assert_eq!(
            config.diagnostics.rules,
            Some(PathBuf::from("/etc/rigwatch/pc200.yaml"))
        );
        assert_eq!(
            config.forecast.url.as_deref(),
            Some("http://127.0.0.1:5005/predict")
        );
        assert_eq!(config.forecast.timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"not a number\"").unwrap();
        let err = DaemonConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
