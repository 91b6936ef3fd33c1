use std::{fmt, str::FromStr, sync::OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::UtcOffset;

use crate::logger::error::LoggerError;

/// Local offset detected at start-up. Unset means UTC.
static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Timezone of log timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogTimeZone {
    #[default]
    Utc,
    /// Offset detected by [`init_local_offset`].
    Local,
}

/// Detect and remember the local UTC offset.
///
/// Detection is unreliable once other threads exist, so call this from `main`
/// before building the async runtime. Falls back to UTC when detection fails.
/// Only the first call has an effect.
pub fn init_local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

pub(crate) fn offset_for(tz: LogTimeZone) -> UtcOffset {
    match tz {
        LogTimeZone::Utc => UtcOffset::UTC,
        LogTimeZone::Local => LOCAL_OFFSET.get().copied().unwrap_or(UtcOffset::UTC),
    }
}

impl LogTimeZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTimeZone::Utc => "utc",
            LogTimeZone::Local => "local",
        }
    }
}

impl FromStr for LogTimeZone {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(LoggerError::InvalidTimeZone(s.to_string())),
        }
    }
}

impl fmt::Display for LogTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LogTimeZone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogTimeZone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
