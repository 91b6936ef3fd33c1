use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Sustained polling rate of the reconciliation loop (one iteration per 5 seconds).
pub const DEFAULT_RATE_PER_SECOND: f64 = 0.2;

/// Token bucket capacity.
pub const DEFAULT_BURST: u32 = 1;

/// How long a granted machine has to report completion.
pub const DEFAULT_REBOOT_TIMEOUT_SECS: u64 = 3_600;

/// Number of machines coordinated per iteration.
pub const DEFAULT_MAX_CONCURRENT_REBOOTS: usize = 1;

/// Component name attached to emitted events.
pub const DEFAULT_REPORTER: &str = "update-operator";

/// Token bucket settings for the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Tokens added per second.
    pub per_second: f64,
    /// Maximum number of stored tokens.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: DEFAULT_RATE_PER_SECOND,
            burst: DEFAULT_BURST,
        }
    }
}

/// Operator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperatorConfig {
    pub rate_limit: RateLimitConfig,
    /// Coordination deadline in seconds.
    pub reboot_timeout_secs: u64,
    /// Upper bound on coordinations running at once.
    ///
    /// `1` keeps the fleet strictly serial. Larger values coordinate the first N
    /// candidates of an iteration in parallel.
    pub max_concurrent_reboots: usize,
    /// Event source component name.
    pub reporter: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            reboot_timeout_secs: DEFAULT_REBOOT_TIMEOUT_SECS,
            max_concurrent_reboots: DEFAULT_MAX_CONCURRENT_REBOOTS,
            reporter: DEFAULT_REPORTER.to_string(),
        }
    }
}

impl OperatorConfig {
    /// Coordination deadline as a [`Duration`].
    pub fn reboot_timeout(&self) -> Duration {
        Duration::from_secs(self.reboot_timeout_secs)
    }

    /// Validate the configuration.
    ///
    /// Rules:
    /// - `rateLimit.perSecond` is finite and positive;
    /// - `rateLimit.burst`, `rebootTimeoutSecs` and `maxConcurrentReboots` are non-zero;
    /// - `reporter` is not blank.
    pub fn validate(&self) -> Result<(), CoreError> {
        let rate = self.rate_limit.per_second;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "rateLimit.perSecond must be a positive number, got {rate}"
            )));
        }
        if self.rate_limit.burst == 0 {
            return Err(CoreError::InvalidConfig(
                "rateLimit.burst must be at least 1".into(),
            ));
        }
        if self.reboot_timeout_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "rebootTimeoutSecs must be at least 1".into(),
            ));
        }
        if self.max_concurrent_reboots == 0 {
            return Err(CoreError::InvalidConfig(
                "maxConcurrentReboots must be at least 1".into(),
            ));
        }
        if self.reporter.trim().is_empty() {
            return Err(CoreError::InvalidConfig("reporter is empty".into()));
        }
        Ok(())
    }
}
