use crate::fetcher::DEFAULT_BATCH_SIZE;
use crate::waiter::{WaitOptions, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
/// Loaded from <config_dir>/flowctl/config.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default)]
    pub defaults: Defaults,
}

/// Where the manager's REST API lives and who to talk to it as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            protocol: Protocol::default(),
            tenant: None,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub include_logs: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
            include_logs: false,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

impl Defaults {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Wait options seeded from these defaults.
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::default()
            .timeout(Some(self.timeout()))
            .poll_interval(self.poll_interval())
            .batch_size(self.batch_size)
            .include_logs(self.include_logs)
    }
}

impl Config {
    /// Load config from the default path, falling back to built-in defaults
    /// when no file exists.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("flowctl")
            .join("config.yaml")
    }

    /// Base URL of the manager, e.g. `https://10.0.0.5:443`.
    pub fn manager_url(&self) -> String {
        let manager = &self.manager;
        let port = manager
            .port
            .unwrap_or_else(|| manager.protocol.default_port());
        format!("{}://{}:{}", manager.protocol, manager.host, port)
    }
}
