#![cfg(feature = "subscriber")]

//! Supervisor event logging.
//!
//! Maps taskvisor lifecycle events to tracing records so restarts and backoff
//! of the operator task show up next to the operator's own logs.
use async_trait::async_trait;
use taskvisor::{Event, EventKind, Subscribe};
use tracing::{Level, debug, error, info, trace, warn};

/// Queue capacity of the subscriber worker; overflow drops events.
const QUEUE_CAPACITY: usize = 1024;

/// Logs every supervisor event through `tracing`.
#[derive(Debug, Default)]
pub struct Subscriber;

#[async_trait]
impl Subscribe for Subscriber {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "cadence-log"
    }

    fn queue_capacity(&self) -> usize {
        QUEUE_CAPACITY
    }
}

macro_rules! at_level {
    ($lvl:expr, $($arg:tt)+) => {{
        let lvl: Level = $lvl;
        if lvl == Level::ERROR {
            error!($($arg)+)
        } else if lvl == Level::WARN {
            warn!($($arg)+)
        } else if lvl == Level::INFO {
            info!($($arg)+)
        } else if lvl == Level::DEBUG {
            debug!($($arg)+)
        } else {
            trace!($($arg)+)
        }
    }};
}

fn log_event(e: &Event) {
    let (level, msg) = classify(e);
    let task = e.task.as_deref().unwrap_or("-");

    match (e.reason.as_deref(), e.delay_ms) {
        (Some(reason), Some(delay_ms)) => at_level!(
            level,
            task,
            attempt = e.attempt.unwrap_or(0),
            delay_ms,
            reason,
            "{msg}"
        ),
        (None, Some(delay_ms)) => at_level!(
            level,
            task,
            attempt = e.attempt.unwrap_or(0),
            delay_ms,
            "{msg}"
        ),
        (Some(reason), None) => at_level!(
            level,
            task,
            attempt = e.attempt.unwrap_or(0),
            reason,
            "{msg}"
        ),
        (None, None) => at_level!(
            level,
            task,
            attempt = e.attempt.unwrap_or(0),
            timeout_ms = e.timeout_ms.unwrap_or(0),
            "{msg}"
        ),
    }
}

/// Severity and message for one event.
fn classify(e: &Event) -> (Level, &'static str) {
    match e.kind {
        EventKind::TaskStarting => (Level::INFO, "task starting"),
        EventKind::TaskStopped => (Level::DEBUG, "task stopped"),
        EventKind::TaskFailed => (Level::ERROR, "task failed"),
        EventKind::TimeoutHit => (Level::WARN, "task exceeded its timeout"),
        EventKind::BackoffScheduled if e.reason.is_some() => {
            (Level::WARN, "retry scheduled after failure")
        }
        EventKind::BackoffScheduled => (Level::DEBUG, "next run scheduled"),
        EventKind::ActorExhausted => (Level::WARN, "task will not be restarted"),
        EventKind::ActorDead => (Level::ERROR, "task terminated permanently"),
        EventKind::ShutdownRequested => (Level::INFO, "shutdown requested"),
        EventKind::AllStoppedWithinGrace => (Level::INFO, "all tasks stopped"),
        EventKind::GraceExceeded => (Level::WARN, "tasks did not stop within grace period"),
        EventKind::SubscriberOverflow => (Level::ERROR, "supervisor event dropped"),
        EventKind::SubscriberPanicked => (Level::ERROR, "supervisor subscriber panicked"),
        EventKind::TaskAdded => (Level::DEBUG, "task added"),
        EventKind::TaskRemoved => (Level::DEBUG, "task removed"),
        #[allow(unreachable_patterns)]
        _ => (Level::TRACE, "supervisor event"),
    }
}
