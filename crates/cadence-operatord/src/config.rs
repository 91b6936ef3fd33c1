use std::{net::SocketAddr, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use cadence_core::config::OperatorConfig;
use cadence_observe::LogConfig;

/// Path of the JSON configuration file.
pub const ENV_CONFIG: &str = "CADENCE_CONFIG";

/// Log filter override, e.g. `cadence_core=debug,info`.
pub const ENV_LOG: &str = "CADENCE_LOG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DaemonConfig {
    pub operator: OperatorConfig,
    pub logger: LogConfig,
    /// Address of the `/metrics` and `/healthz` endpoints; disabled when unset.
    pub metrics_addr: Option<SocketAddr>,
}

impl DaemonConfig {
    /// Load from the file named by `CADENCE_CONFIG` (defaults when unset),
    /// then apply the `CADENCE_LOG` override.
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = match std::env::var_os(ENV_CONFIG) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        match std::env::var(ENV_LOG) {
            Ok(level) => cfg.with_log_override(&level),
            Err(_) => Ok(cfg),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.operator.validate()?;
        Ok(cfg)
    }

    fn with_log_override(mut self, level: &str) -> anyhow::Result<Self> {
        self.logger = self
            .logger
            .with_level(level)
            .with_context(|| format!("invalid {ENV_LOG}"))?;
        Ok(self)
    }
}
