use std::sync::Arc;

use crate::coordinator::CoordinationOutcome;

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record the start of a reconciliation iteration.
    fn record_iteration(&self);
    /// Record a failed listing of the fleet.
    fn record_list_failure(&self);
    /// Record one attempt to withdraw the grant from a rebooted machine.
    ///
    /// # Arguments
    /// - `ok`: whether the annotation write succeeded
    fn record_acknowledge(&self, ok: bool);
    /// Record the end of one coordination.
    ///
    /// # Arguments
    /// - `outcome`: how the coordination ended
    /// - `duration_ms`: time from grant to outcome in milliseconds
    fn record_coordination(&self, outcome: &CoordinationOutcome, duration_ms: u64);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
