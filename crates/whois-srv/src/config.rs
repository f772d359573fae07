//! Server configuration for whoisd.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a WHOIS registry server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// TCP listen address (default: 0.0.0.0:43).
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Storage root holding `ipv4/`, `ipv6/`, `domain/` and `asn/`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How often to rebuild the registry snapshot (seconds, 0 disables).
    #[serde(default = "default_rebuild_interval")]
    pub rebuild_interval_secs: u64,

    /// Hard ceiling on a client connection, data or not (seconds).
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Longest query line accepted (bytes).
    #[serde(default = "default_max_query_len")]
    pub max_query_len: usize,

    /// Dynamic pull scheduler.
    #[serde(default)]
    pub pull: PullConfig,

    /// External IPAM address feed.
    #[serde(default)]
    pub ipam: IpamConfig,
}

/// Dynamic pull scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullConfig {
    /// Time for one full round over every pull target (milliseconds).
    /// Unset disables pulling.
    #[serde(default)]
    pub budget_ms: Option<u64>,

    /// Upstream connect timeout (seconds).
    #[serde(default = "default_pull_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Hard limit on one pull, connect included (seconds).
    #[serde(default = "default_pull_timeout")]
    pub timeout_secs: u64,
}

/// IPAM feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpamConfig {
    /// Whether to merge IPAM subnets into the address table.
    #[serde(default)]
    pub enabled: bool,

    /// Subnet list endpoint.
    #[serde(default)]
    pub url: String,

    /// API token, sent in the `token` header.
    #[serde(default)]
    pub token: Option<String>,

    /// HTTP request timeout (seconds).
    #[serde(default = "default_ipam_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            data_dir: default_data_dir(),
            rebuild_interval_secs: default_rebuild_interval(),
            idle_timeout_secs: default_idle_timeout(),
            max_query_len: default_max_query_len(),
            pull: PullConfig::default(),
            ipam: IpamConfig::default(),
        }
    }
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            budget_ms: None,
            connect_timeout_secs: default_pull_connect_timeout(),
            timeout_secs: default_pull_timeout(),
        }
    }
}

impl Default for IpamConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            token: None,
            timeout_secs: default_ipam_timeout(),
        }
    }
}

impl ServerConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| crate::SrvError::Config(e.to_string()))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> crate::Result<()> {
        if self.ipam.enabled && self.ipam.url.trim().is_empty() {
            return Err(crate::SrvError::Config(
                "ipam.enabled is set but ipam.url is empty".into(),
            ));
        }
        if self.pull.budget_ms == Some(0) {
            return Err(crate::SrvError::Config(
                "pull.budget_ms must be greater than zero".into(),
            ));
        }
        if self.max_query_len == 0 {
            return Err(crate::SrvError::Config(
                "max_query_len must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Rebuild period, `None` when periodic rebuilds are off.
    #[must_use]
    pub const fn rebuild_interval(&self) -> Option<Duration> {
        match self.rebuild_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Per-connection ceiling.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl PullConfig {
    /// Total round budget, `None` when pulling is off.
    #[must_use]
    pub const fn budget(&self) -> Option<Duration> {
        match self.budget_ms {
            Some(ms) if ms > 0 => Some(Duration::from_millis(ms)),
            _ => None,
        }
    }
}

// Default value functions for serde.
fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 43))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

const fn default_rebuild_interval() -> u64 {
    60
}

const fn default_idle_timeout() -> u64 {
    5
}

const fn default_max_query_len() -> usize {
    1024
}

const fn default_pull_connect_timeout() -> u64 {
    5
}

const fn default_pull_timeout() -> u64 {
    10
}

const fn default_ipam_timeout() -> u64 {
    30
}
