use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::logger::error::LoggerError;

/// Output format of the logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
    /// systemd-journald (Linux only).
    Journald,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Journald => "journald",
        }
    }
}

impl FromStr for LogFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            #[cfg(target_os = "linux")]
            "journald" | "journal" => Ok(Self::Journald),
            #[cfg(not(target_os = "linux"))]
            "journald" | "journal" => Err(LoggerError::JournaldNotSupported),
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LogFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitive() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Text".parse::<LogFormat>().unwrap(), LogFormat::Text);
    }

    #[test]
    fn rejects_unknown_format() {
        for input in ["", "xml", "logfmt", "text-json"] {
            assert!(
                matches!(input.parse::<LogFormat>(), Err(LoggerError::InvalidFormat(_))),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn journald_depends_on_platform() {
        let parsed = "journald".parse::<LogFormat>();

        #[cfg(target_os = "linux")]
        assert_eq!(parsed.unwrap(), LogFormat::Journald);

        #[cfg(not(target_os = "linux"))]
        assert!(matches!(parsed, Err(LoggerError::JournaldNotSupported)));
    }

    #[test]
    fn serializes_as_canonical_string() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), r#""json""#);

        let parsed: LogFormat = serde_json::from_str(r#""TEXT""#).unwrap();
        assert_eq!(parsed, LogFormat::Text);
    }
}
