//! Reconciliation loop.
//!
//! One iteration:
//! 1. list the fleet and withdraw the grant from every machine that finished rebooting;
//! 2. list again and pick the first machine(s) that want to reboot, in listing order;
//! 3. coordinate them, waiting for the coordination to finish before the next iteration.
//!
//! Iterations are paced by a token bucket. Failures never leave the loop: they are
//! logged and the next iteration re-derives ground truth from a fresh listing.
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use cadence_model::{ANNOTATION_OK_TO_REBOOT, Annotations, FALSE, Machine};

use crate::{
    context::OperatorContext,
    coordinator::{CoordinationOutcome, Coordinator},
    error::CoreError,
    ratelimit::TokenBucket,
    selector::Selector,
};

/// Why an iteration stopped before coordinating anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The first listing failed.
    ListFailed,
    /// The listing after acknowledgements failed.
    RelistFailed,
    /// No machine wants to reboot.
    NoCandidates,
}

/// What one iteration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Machines whose grant was withdrawn.
    pub acknowledged: Vec<String>,
    /// Machines whose grant could not be withdrawn.
    pub acknowledge_failures: Vec<String>,
    /// Number of machines that wanted to reboot after acknowledgements.
    pub candidates: usize,
    /// Coordinated machines with their outcome.
    pub coordinated: Vec<(String, CoordinationOutcome)>,
    pub skipped: Option<SkipReason>,
}

/// Central reboot arbiter.
pub struct Operator {
    ctx: OperatorContext,
    limiter: TokenBucket,
    coordinator: Coordinator,
}

impl Operator {
    /// Build an operator from a validated context.
    pub fn new(ctx: OperatorContext) -> Result<Self, CoreError> {
        ctx.config().validate()?;

        Ok(Self {
            limiter: TokenBucket::from_config(&ctx.config().rate_limit),
            coordinator: Coordinator::new(ctx.clone()),
            ctx,
        })
    }

    pub fn context(&self) -> &OperatorContext {
        &self.ctx
    }

    /// Run iterations until `cancel` fires.
    ///
    /// Cancellation is only observed between iterations, while waiting for a token.
    /// A coordination in progress runs to its own deadline.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(ctx = %self.ctx, "operator started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("operator stopping");
                    return;
                }
                _ = self.limiter.acquire() => {}
            }
            self.reconcile_once().await;
        }
    }

    /// Run one iteration.
    #[instrument(level = "debug", skip(self))]
    pub async fn reconcile_once(&self) -> IterationReport {
        self.ctx.metrics().record_iteration();
        let mut report = IterationReport::default();
        let repo = self.ctx.repository();

        let machines = match repo.list().await {
            Ok(m) => m,
            Err(e) => {
                info!(error = %e, "failed listing nodes");
                self.ctx.metrics().record_list_failure();
                report.skipped = Some(SkipReason::ListFailed);
                return report;
            }
        };
        self.acknowledge(&machines, &mut report).await;

        let machines = match repo.list().await {
            Ok(m) => m,
            Err(e) => {
                info!(error = %e, "failed listing nodes");
                self.ctx.metrics().record_list_failure();
                report.skipped = Some(SkipReason::RelistFailed);
                return report;
            }
        };

        let selector = Selector::WantsReboot;
        let candidates: Vec<&Machine> = selector.filter(&machines).collect();
        report.candidates = candidates.len();
        if candidates.is_empty() {
            debug!("no nodes need a reboot");
            report.skipped = Some(SkipReason::NoCandidates);
            return report;
        }

        let batch: Vec<Machine> = candidates
            .into_iter()
            .take(self.ctx.config().max_concurrent_reboots)
            .cloned()
            .collect();
        let names: Vec<&str> = batch.iter().map(|m| m.name.as_str()).collect();
        info!(
            selector = selector.name(),
            count = report.candidates,
            nodes = ?names,
            "found nodes that need a reboot",
        );

        report.coordinated = self.coordinate(batch).await;
        report
    }

    /// Withdraw the grant from every machine in `machines` that just rebooted.
    ///
    /// Each machine is written independently; a failed write is logged and skipped.
    /// Machines that no longer match the selector are not written.
    pub async fn acknowledge(&self, machines: &[Machine], report: &mut IterationReport) {
        let selector = Selector::JustRebooted;
        let rebooted: Vec<&Machine> = selector.filter(machines).collect();
        if rebooted.is_empty() {
            return;
        }
        info!(
            selector = selector.name(),
            count = rebooted.len(),
            "found rebooted nodes, setting annotation {ANNOTATION_OK_TO_REBOOT:?} to false",
        );

        let revoke = Annotations::new().with(ANNOTATION_OK_TO_REBOOT, FALSE);
        for m in rebooted {
            match self
                .ctx
                .repository()
                .set_annotations(&m.name, &revoke)
                .await
            {
                Ok(()) => {
                    self.ctx.metrics().record_acknowledge(true);
                    report.acknowledged.push(m.name.clone());
                }
                Err(e) => {
                    info!(
                        node = %m.name,
                        error = %e,
                        "failed setting annotation {ANNOTATION_OK_TO_REBOOT:?} to false",
                    );
                    self.ctx.metrics().record_acknowledge(false);
                    report.acknowledge_failures.push(m.name.clone());
                }
            }
        }
    }

    async fn coordinate(&self, batch: Vec<Machine>) -> Vec<(String, CoordinationOutcome)> {
        if let [machine] = batch.as_slice() {
            let outcome = self.coordinator.coordinate(machine).await;
            return vec![(machine.name.clone(), outcome)];
        }

        let mut set = JoinSet::new();
        for machine in batch {
            let coordinator = self.coordinator.clone();
            set.spawn(async move {
                let outcome = coordinator.coordinate(&machine).await;
                (machine.name, outcome)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!(error = %e, "coordination task failed"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use tokio::time::{Instant, sleep};

    use super::*;
    use crate::{
        config::OperatorConfig,
        coordinator::AbortReason,
        memory::{MemoryEvents, MemoryFleet},
        metrics::MetricsBackend,
        repository::NodeRepository,
    };
    use cadence_model::{
        ANNOTATION_REBOOT_IN_PROGRESS, ANNOTATION_REBOOT_NEEDED, ANNOTATION_REBOOT_PAUSED, TRUE,
    };

    #[derive(Default)]
    struct CountingMetrics {
        iterations: AtomicUsize,
        list_failures: AtomicUsize,
        acks_ok: AtomicUsize,
        acks_failed: AtomicUsize,
        coordinations: AtomicUsize,
    }

    impl MetricsBackend for CountingMetrics {
        fn record_iteration(&self) {
            self.iterations.fetch_add(1, Ordering::Relaxed);
        }

        fn record_list_failure(&self) {
            self.list_failures.fetch_add(1, Ordering::Relaxed);
        }

        fn record_acknowledge(&self, ok: bool) {
            if ok {
                self.acks_ok.fetch_add(1, Ordering::Relaxed);
            } else {
                self.acks_failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        fn record_coordination(&self, _: &CoordinationOutcome, _: u64) {
            self.coordinations.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn just_rebooted() -> Annotations {
        Annotations::new()
            .with(ANNOTATION_OK_TO_REBOOT, TRUE)
            .with(ANNOTATION_REBOOT_NEEDED, FALSE)
            .with(ANNOTATION_REBOOT_IN_PROGRESS, FALSE)
    }

    fn wants_reboot() -> Annotations {
        Annotations::new().with(ANNOTATION_REBOOT_NEEDED, TRUE)
    }

    fn operator_with(
        fleet: &MemoryFleet,
        events: &MemoryEvents,
        config: OperatorConfig,
    ) -> (Operator, Arc<CountingMetrics>) {
        let metrics = Arc::new(CountingMetrics::default());
        let ctx = OperatorContext::new(Arc::new(fleet.clone()), Arc::new(events.clone()))
            .with_config(config)
            .with_metrics(metrics.clone());
        (Operator::new(ctx).unwrap(), metrics)
    }

    fn operator(fleet: &MemoryFleet, events: &MemoryEvents) -> (Operator, Arc<CountingMetrics>) {
        operator_with(fleet, events, OperatorConfig::default())
    }

    /// Play the agent: finish the reboot of `name` once the grant shows up.
    fn spawn_agent(fleet: &MemoryFleet, name: &'static str, after: Duration) {
        let fleet = fleet.clone();
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(1)).await;
                let granted = fleet
                    .get(name)
                    .map(|m| m.annotations.get(ANNOTATION_OK_TO_REBOOT) == Some(TRUE))
                    .unwrap_or(false);
                if granted {
                    break;
                }
            }
            fleet.apply(
                name,
                &Annotations::new().with(ANNOTATION_REBOOT_IN_PROGRESS, TRUE),
            );
            sleep(after).await;
            fleet.apply(
                name,
                &Annotations::new()
                    .with(ANNOTATION_REBOOT_NEEDED, FALSE)
                    .with(ANNOTATION_REBOOT_IN_PROGRESS, FALSE),
            );
        });
    }

    #[test]
    fn new_rejects_invalid_config() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        let ctx = OperatorContext::new(Arc::new(fleet), Arc::new(events)).with_config(
            OperatorConfig {
                max_concurrent_reboots: 0,
                ..Default::default()
            },
        );

        assert!(matches!(
            Operator::new(ctx),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_single_iteration() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        fleet.insert("a", just_rebooted());
        fleet.insert("b", wants_reboot());
        let c = fleet.insert("c", wants_reboot().with(ANNOTATION_REBOOT_PAUSED, TRUE));
        spawn_agent(&fleet, "b", Duration::from_secs(90));

        let (op, _) = operator(&fleet, &events);
        let report = op.reconcile_once().await;

        assert_eq!(report.acknowledged, ["a"]);
        assert!(report.acknowledge_failures.is_empty());
        assert_eq!(report.candidates, 1);
        assert_eq!(
            report.coordinated,
            vec![("b".to_string(), CoordinationOutcome::Completed)]
        );
        assert_eq!(report.skipped, None);

        assert_eq!(
            fleet.get("a").unwrap().annotations.get(ANNOTATION_OK_TO_REBOOT),
            Some(FALSE)
        );
        assert_eq!(
            fleet.get("b").unwrap().annotations.get(ANNOTATION_OK_TO_REBOOT),
            Some(TRUE)
        );
        assert_eq!(fleet.get("c").unwrap(), c);
        assert!(fleet.writes_for("c").is_empty());
        assert!(events.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn completed_machine_is_acknowledged_on_next_iteration() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        fleet.insert("b", wants_reboot());
        spawn_agent(&fleet, "b", Duration::from_secs(10));

        let (op, _) = operator(&fleet, &events);
        op.reconcile_once().await;
        let second = op.reconcile_once().await;

        assert_eq!(second.acknowledged, ["b"]);
        assert_eq!(second.skipped, Some(SkipReason::NoCandidates));
        assert_eq!(
            fleet.writes_for("b"),
            vec![
                Annotations::new().with(ANNOTATION_OK_TO_REBOOT, TRUE),
                Annotations::new().with(ANNOTATION_OK_TO_REBOOT, FALSE),
            ]
        );
    }

    #[tokio::test]
    async fn failed_acknowledgement_does_not_block_the_batch() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        fleet.insert("a", just_rebooted());
        fleet.insert("b", just_rebooted());
        fleet.insert("c", just_rebooted());
        fleet.fail_writes_for("b");

        let (op, metrics) = operator(&fleet, &events);
        let report = op.reconcile_once().await;

        assert_eq!(report.acknowledged, ["a", "c"]);
        assert_eq!(report.acknowledge_failures, ["b"]);
        assert_eq!(metrics.acks_ok.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.acks_failed.load(Ordering::Relaxed), 1);
        assert_eq!(
            fleet.get("c").unwrap().annotations.get(ANNOTATION_OK_TO_REBOOT),
            Some(FALSE)
        );
    }

    #[tokio::test]
    async fn acknowledgement_is_a_no_op_for_non_matching_machines() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        let a = fleet.insert("a", just_rebooted());

        let (op, _) = operator(&fleet, &events);
        let mut report = IterationReport::default();
        op.acknowledge(&[a], &mut report).await;
        assert_eq!(fleet.writes().len(), 1);

        // Re-run against a fresh listing: "a" no longer matches.
        let fresh = fleet.list().await.unwrap();
        let mut report = IterationReport::default();
        op.acknowledge(&fresh, &mut report).await;

        assert_eq!(fleet.writes().len(), 1);
        assert!(report.acknowledged.is_empty());
    }

    #[tokio::test]
    async fn list_failure_skips_the_iteration() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        fleet.insert("a", just_rebooted());
        fleet.fail_next_lists(1);

        let (op, metrics) = operator(&fleet, &events);
        let report = op.reconcile_once().await;

        assert_eq!(report.skipped, Some(SkipReason::ListFailed));
        assert!(fleet.writes().is_empty());
        assert_eq!(metrics.list_failures.load(Ordering::Relaxed), 1);

        // Next iteration retries normally.
        let report = op.reconcile_once().await;
        assert_eq!(report.acknowledged, ["a"]);
    }

    #[tokio::test]
    async fn no_candidates_skips_coordination() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        fleet.insert("p", wants_reboot().with(ANNOTATION_REBOOT_PAUSED, TRUE));

        let (op, metrics) = operator(&fleet, &events);
        let report = op.reconcile_once().await;

        assert_eq!(report.skipped, Some(SkipReason::NoCandidates));
        assert!(report.coordinated.is_empty());
        assert_eq!(metrics.coordinations.load(Ordering::Relaxed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn only_first_candidate_is_coordinated_by_default() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        fleet.insert("x", wants_reboot());
        fleet.insert("y", wants_reboot());
        spawn_agent(&fleet, "x", Duration::from_secs(5));

        let (op, _) = operator(&fleet, &events);
        let report = op.reconcile_once().await;

        assert_eq!(report.candidates, 2);
        assert_eq!(
            report.coordinated,
            vec![("x".to_string(), CoordinationOutcome::Completed)]
        );
        assert!(fleet.writes_for("y").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_machine_is_reselected_later() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        fleet.insert("b", wants_reboot());

        let (op, _) = operator(&fleet, &events);
        let first = op.reconcile_once().await;
        assert_eq!(
            first.coordinated,
            vec![("b".to_string(), CoordinationOutcome::TimedOut)]
        );
        assert_eq!(events.events().len(), 1);

        spawn_agent(&fleet, "b", Duration::from_secs(5));
        let second = op.reconcile_once().await;
        assert_eq!(
            second.coordinated,
            vec![("b".to_string(), CoordinationOutcome::Completed)]
        );
        assert_eq!(events.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn grant_failure_is_reported_and_machine_stays_eligible() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        let b = fleet.insert("b", wants_reboot());
        fleet.fail_writes_for("b");

        let (op, _) = operator(&fleet, &events);
        let report = op.reconcile_once().await;

        assert_eq!(
            report.coordinated,
            vec![(
                "b".to_string(),
                CoordinationOutcome::Aborted(AbortReason::GrantFailed)
            )]
        );
        assert_eq!(fleet.get("b").unwrap(), b);
        assert!(events.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_bound_coordinates_several_candidates() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        for name in ["x", "y", "z"] {
            fleet.insert(name, wants_reboot());
        }
        spawn_agent(&fleet, "x", Duration::from_secs(20));
        spawn_agent(&fleet, "y", Duration::from_secs(10));

        let config = OperatorConfig {
            max_concurrent_reboots: 2,
            ..Default::default()
        };
        let (op, metrics) = operator_with(&fleet, &events, config);
        let start = Instant::now();
        let mut report = op.reconcile_once().await;
        report.coordinated.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(
            report.coordinated,
            vec![
                ("x".to_string(), CoordinationOutcome::Completed),
                ("y".to_string(), CoordinationOutcome::Completed),
            ]
        );
        // Both ran side by side: well under the sum of their individual waits plus polling.
        assert!(start.elapsed() < Duration::from_secs(60));
        assert!(fleet.writes_for("z").is_empty());
        assert_eq!(metrics.coordinations.load(Ordering::Relaxed), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_cancellation_between_iterations() {
        let fleet = MemoryFleet::new();
        let events = MemoryEvents::new();
        let (mut op, metrics) = operator(&fleet, &events);

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(12)).await;
            stopper.cancel();
        });

        op.run(cancel).await;

        // Tokens at t=0, 5s, 10s; cancelled while waiting for the one at 15s.
        assert_eq!(metrics.iterations.load(Ordering::Relaxed), 3);
    }
}
