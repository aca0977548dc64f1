use crate::types::{BASE_PORT, Link, LinkCost, RouterId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is empty, expected the router id on line 1")]
    MissingRouterId,

    #[error("line {line}: invalid router id {value:?}")]
    InvalidRouterId { line: usize, value: String },

    #[error("line {line}: expected `neighbor,cost`, got {value:?}")]
    InvalidLink { line: usize, value: String },

    #[error("reload interval {0} is not a usable number of seconds")]
    InvalidReloadInterval(f64),
}

/// Contents of a router's link file: own id on the first line, then one
/// `neighbor,cost` pair per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborConfig {
    pub router_id: RouterId,
    pub links: Vec<Link>,
}

impl NeighborConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (line, first) = lines.next().ok_or(ConfigError::MissingRouterId)?;
        let router_id = first
            .parse::<u16>()
            .map(RouterId)
            .map_err(|_| ConfigError::InvalidRouterId {
                line,
                value: first.to_string(),
            })?;

        let links = lines
            .map(|(line, text)| parse_link(text).ok_or_else(|| ConfigError::InvalidLink {
                line,
                value: text.to_string(),
            }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { router_id, links })
    }
}

fn parse_link(text: &str) -> Option<Link> {
    let (neighbor, cost) = text.split_once(',')?;
    Some(Link {
        neighbor: RouterId(neighbor.trim().parse().ok()?),
        cost: LinkCost(cost.trim().parse().ok()?),
    })
}

/// Process-level knobs, optionally loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub reload_interval_secs: f64,
    pub base_port: u16,
    pub bind_address: IpAddr,
    pub status_file: Option<PathBuf>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            reload_interval_secs: 5.0,
            base_port: BASE_PORT,
            bind_address: IpAddr::from([127, 0, 0, 1]),
            status_file: None,
        }
    }
}

impl DaemonSettings {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings: DaemonSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Rejects settings the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reload_interval().map(|_| ())
    }

    /// Negative, NaN, infinite and out-of-range values are errors.
    pub fn reload_interval(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.reload_interval_secs)
            .map_err(|_| ConfigError::InvalidReloadInterval(self.reload_interval_secs))
    }
}
