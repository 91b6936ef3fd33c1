use std::fmt;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

use crate::logger::object::timezone::{LogTimeZone, offset_for};

/// RFC 3339 timestamps in the configured timezone.
#[derive(Debug, Clone, Copy)]
pub struct LogTimer {
    tz: LogTimeZone,
}

impl LogTimer {
    pub fn new(tz: LogTimeZone) -> Self {
        Self { tz }
    }

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(offset_for(self.tz))
    }
}

impl FormatTime for LogTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match self.now().format(&Rfc3339) {
            Ok(ts) => write!(w, "{ts}"),
            Err(_) => write!(w, "<invalid-time>"),
        }
    }
}
