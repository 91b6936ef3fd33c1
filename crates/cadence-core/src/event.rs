//! Write-only observability sink for operator events.
use async_trait::async_trait;
use tracing::{info, warn};

use cadence_model::{Event, Severity};

/// Fire-and-forget event sink.
///
/// Delivery failures are the sink's business; nothing is reported back to the caller.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

/// Sink that writes events to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn emit(&self, event: Event) {
        match event.severity {
            Severity::Normal => info!(
                node = %event.target,
                reason = %event.reason,
                "{}",
                event.message
            ),
            Severity::Warning => warn!(
                node = %event.target,
                reason = %event.reason,
                "{}",
                event.message
            ),
        }
    }
}
