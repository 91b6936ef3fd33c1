use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Severity of an operator-visible event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Normal,
    Warning,
}

impl Severity {
    /// Canonical name, as used by Kubernetes event types.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "Normal",
            Severity::Warning => "Warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "warning" => Ok(Self::Warning),
            _ => Err(ModelError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Immutable, write-only notification attached to a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Name of the machine the event refers to.
    pub target: String,
    pub severity: Severity,
    /// Short machine-readable reason.
    pub reason: String,
    /// Human-readable message.
    pub message: String,
}

impl Event {
    /// Build a warning event.
    pub fn warning(
        target: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            severity: Severity::Warning,
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Build a normal event.
    pub fn normal(
        target: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            severity: Severity::Normal,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parses_case_insensitive() {
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("Normal".parse::<Severity>().unwrap(), Severity::Normal);
        assert!("error".parse::<Severity>().is_err());
    }

    #[test]
    fn warning_constructor_sets_severity() {
        let e = Event::warning("node-a", "reboot failed", "timed out");
        assert_eq!(e.severity, Severity::Warning);
        assert_eq!(e.target, "node-a");
        assert_eq!(e.reason, "reboot failed");
    }
}
