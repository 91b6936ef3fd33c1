use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::error::LoggerError;

/// Validated `EnvFilter` expression.
///
/// The raw string is kept so the config can be serialized back unchanged;
/// it is checked with `EnvFilter::try_new` on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogLevel(String);

impl LogLevel {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the filter. Falls back to `info` if the stored expression stopped parsing.
    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.0).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LogLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LogLevel {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        EnvFilter::try_new(&s)
            .map(|_| LogLevel(s.clone()))
            .map_err(|e| LoggerError::InvalidLevel(format!("{s}: {e}")))
    }
}

impl From<LogLevel> for String {
    fn from(l: LogLevel) -> Self {
        l.0
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_expressions() {
        for lvl in [
            "info",
            "warn",
            "trace",
            "cadence_core=debug,info",
            "cadence_kube=trace,kube=warn,info",
        ] {
            assert!(lvl.parse::<LogLevel>().is_ok(), "expected {lvl} to parse");
        }
    }

    #[test]
    fn rejects_invalid_expressions() {
        for lvl in ["cadence_core=loud", "a=trace,b=wat"] {
            assert!(
                matches!(lvl.parse::<LogLevel>(), Err(LoggerError::InvalidLevel(_))),
                "expected {lvl} to be rejected"
            );
        }
    }

    #[test]
    fn serde_keeps_the_raw_string() {
        let lvl: LogLevel = serde_json::from_str(r#""cadence_core=debug,info""#).unwrap();
        assert_eq!(lvl.as_str(), "cadence_core=debug,info");
        assert_eq!(
            serde_json::to_string(&lvl).unwrap(),
            r#""cadence_core=debug,info""#
        );
    }

    #[test]
    fn default_is_info() {
        let lvl = LogLevel::default();
        assert_eq!(lvl.as_str(), "info");
        let _ = lvl.to_env_filter();
    }
}
