use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::{
    error::LoggerResult,
    object::{LogFormat, LogLevel, LogTimeZone},
};

/// Logger configuration, embedded in the daemon configuration under `logger`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter expression, e.g. `"info"` or `"cadence_core=debug,info"`.
    pub level: LogLevel,
    pub tz: LogTimeZone,
    /// Include the event target (module path) in each line.
    pub with_targets: bool,
    /// Allow ANSI colours in text output.
    pub use_color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::default(),
            tz: LogTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LogConfig {
    /// Colours are used only when enabled and stdout is a terminal.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }

    /// Replace the filter expression, e.g. from an environment override.
    pub fn with_level(mut self, level: &str) -> LoggerResult<Self> {
        self.level = level.parse()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = LogConfig::default();

        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.tz, LogTimeZone::Utc);
        assert_eq!(config.level.as_str(), "info");
        assert!(config.with_targets);
        assert!(config.use_color);
    }

    #[test]
    fn empty_object_uses_defaults() {
        let config: LogConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.format, LogFormat::default());
        assert_eq!(config.level.as_str(), "info");
        assert!(config.with_targets);
    }

    #[test]
    fn partial_object_uses_camel_case() {
        let json = r#"{"format": "json", "level": "cadence_core=debug,info", "withTargets": false}"#;
        let config: LogConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level.as_str(), "cadence_core=debug,info");
        assert!(!config.with_targets);
        assert!(config.use_color);
    }

    #[test]
    fn invalid_level_is_rejected_at_parse_time() {
        let json = r#"{"level": "cadence_core=loud"}"#;
        assert!(serde_json::from_str::<LogConfig>(json).is_err());
    }

    #[test]
    fn with_level_overrides_filter() {
        let config = LogConfig::default().with_level("warn").unwrap();
        assert_eq!(config.level.as_str(), "warn");

        assert!(LogConfig::default().with_level("x=nope").is_err());
    }
}
