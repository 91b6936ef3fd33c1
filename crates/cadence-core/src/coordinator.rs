//! Reboot coordination for one selected machine.
//!
//! The operator and the remote agent never talk directly. The operator grants permission
//! by writing `OkToReboot=true`, then watches the machine until the agent reports back
//! through its own annotations, or until the deadline passes.
//!
//! ```text
//! Requesting ──grant ok──▶ Waiting ──conjunction on one snapshot──▶ Completed
//!     │                       ├──deadline──▶ TimedOut (Warning event)
//!     └──grant failed─────────┴──watch failed / machine deleted──▶ Aborted
//! ```
use std::{fmt, time::Duration};

use futures::StreamExt;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, instrument, trace, warn};

use cadence_model::{ANNOTATION_OK_TO_REBOOT, Annotations, Event, Machine, MachineChange, TRUE};

use crate::{context::OperatorContext, selector::reboot_completed};

/// Reason attached to the event emitted when a machine does not come back in time.
pub const EVENT_REASON_REBOOT_FAILED: &str = "reboot failed";

/// Message attached to the event emitted when a machine does not come back in time.
pub const EVENT_MESSAGE_TIMED_OUT: &str = "Timed out waiting for node to return after a reboot";

/// Pause before re-opening a change subscription that the store closed early.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Why a coordination ended without reaching a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Writing `OkToReboot=true` failed; the machine is unchanged.
    GrantFailed,
    /// The change subscription could not be opened or reported an error.
    WatchFailed,
    /// The machine disappeared from the store while we were waiting.
    MachineDeleted,
}

/// Terminal state of one coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinationOutcome {
    /// A single snapshot satisfied the completion conjunction before the deadline.
    Completed,
    /// The deadline passed without the conjunction ever holding on one snapshot.
    TimedOut,
    Aborted(AbortReason),
}

impl CoordinationOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            CoordinationOutcome::Completed => "completed",
            CoordinationOutcome::TimedOut => "timed_out",
            CoordinationOutcome::Aborted(AbortReason::GrantFailed) => "grant_failed",
            CoordinationOutcome::Aborted(AbortReason::WatchFailed) => "watch_failed",
            CoordinationOutcome::Aborted(AbortReason::MachineDeleted) => "machine_deleted",
        }
    }
}

impl fmt::Display for CoordinationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Runs the grant/wait handshake against one machine.
#[derive(Clone, Debug)]
pub struct Coordinator {
    ctx: OperatorContext,
}

impl Coordinator {
    pub fn new(ctx: OperatorContext) -> Self {
        Self { ctx }
    }

    /// Coordinate a reboot of `machine`.
    ///
    /// `machine` must be the snapshot the machine was selected from: its version is where
    /// the change subscription starts, so changes racing the grant write are not missed.
    /// Only `machine` is written to.
    #[instrument(level = "debug", skip_all, fields(node = %machine.name))]
    pub async fn coordinate(&self, machine: &Machine) -> CoordinationOutcome {
        let started = Instant::now();
        let outcome = self.run(machine).await;

        let elapsed_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
        self.ctx.metrics().record_coordination(&outcome, elapsed_ms);
        outcome
    }

    async fn run(&self, machine: &Machine) -> CoordinationOutcome {
        let grant = Annotations::new().with(ANNOTATION_OK_TO_REBOOT, TRUE);
        if let Err(e) = self
            .ctx
            .repository()
            .set_annotations(&machine.name, &grant)
            .await
        {
            info!(
                node = %machine.name,
                error = %e,
                "failed to set annotation {ANNOTATION_OK_TO_REBOOT:?}",
            );
            return CoordinationOutcome::Aborted(AbortReason::GrantFailed);
        }
        debug!(node = %machine.name, "reboot granted; waiting for completion");

        let deadline = Instant::now() + self.ctx.config().reboot_timeout();
        let outcome = self.wait_for_completion(machine, deadline).await;

        match outcome {
            CoordinationOutcome::Completed => {
                info!(node = %machine.name, "node rebooted successfully");
            }
            CoordinationOutcome::TimedOut => {
                warn!(node = %machine.name, "failed to wait for successful reboot of node");
                self.ctx
                    .events()
                    .emit(Event::warning(
                        machine.name.clone(),
                        EVENT_REASON_REBOOT_FAILED,
                        EVENT_MESSAGE_TIMED_OUT,
                    ))
                    .await;
            }
            CoordinationOutcome::Aborted(reason) => {
                info!(node = %machine.name, ?reason, "coordination abandoned");
            }
        }
        outcome
    }

    /// Block until one snapshot satisfies the completion conjunction or `deadline` passes.
    ///
    /// The conjunction is evaluated in full on every snapshot; conditions seen on
    /// different snapshots are never combined.
    async fn wait_for_completion(&self, machine: &Machine, deadline: Instant) -> CoordinationOutcome {
        let repo = self.ctx.repository();
        let mut version = machine.version.clone();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return CoordinationOutcome::TimedOut;
            }

            let mut changes = match repo.watch(&machine.name, &version, remaining).await {
                Ok(s) => s,
                Err(e) => {
                    info!(node = %machine.name, error = %e, "failed to watch node");
                    return CoordinationOutcome::Aborted(AbortReason::WatchFailed);
                }
            };

            loop {
                let next = tokio::select! {
                    _ = sleep_until(deadline) => return CoordinationOutcome::TimedOut,
                    next = changes.next() => next,
                };

                match next {
                    None => break,
                    Some(Err(e)) => {
                        info!(node = %machine.name, error = %e, "watch reported an error");
                        return CoordinationOutcome::Aborted(AbortReason::WatchFailed);
                    }
                    Some(Ok(MachineChange::Deleted(_))) => {
                        info!(node = %machine.name, "node deleted while waiting for reboot");
                        return CoordinationOutcome::Aborted(AbortReason::MachineDeleted);
                    }
                    Some(Ok(MachineChange::Applied(snapshot))) => {
                        if snapshot.name != machine.name {
                            continue;
                        }
                        version = snapshot.version.clone();

                        let state = snapshot.reboot_state();
                        if reboot_completed(&state) {
                            return CoordinationOutcome::Completed;
                        }
                        trace!(node = %machine.name, version = %version, ?state, "not done yet");
                    }
                }
            }

            // The store closed the subscription early; resume from the last seen version.
            debug!(node = %machine.name, version = %version, "change stream closed; resubscribing");
            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(RESUBSCRIBE_DELAY.min(remaining)).await;
        }
    }
}
