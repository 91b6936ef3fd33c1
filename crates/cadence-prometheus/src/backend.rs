use std::sync::Arc;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use cadence_core::{coordinator::CoordinationOutcome, metrics::MetricsBackend};

/// Coordinations wait up to an hour for the agent, so buckets span seconds to that deadline.
const DURATION_BUCKETS: [f64; 10] = [
    1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
];

/// Prometheus metrics backend.
///
/// All labels are bounded: `result` is `ok`/`error`, `outcome` is one of
/// [`CoordinationOutcome::as_label`].
#[derive(Clone)]
pub struct PrometheusMetrics {
    iterations: IntCounter,
    list_failures: IntCounter,
    acknowledgements: IntCounterVec,
    coordinations: IntCounterVec,
    coordination_duration: HistogramVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Register the operator metrics in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let iterations = IntCounter::with_opts(Opts::new(
            "cadence_iterations_total",
            "Reconciliation iterations started",
        ))?;
        registry.register(Box::new(iterations.clone()))?;

        let list_failures = IntCounter::with_opts(Opts::new(
            "cadence_list_failures_total",
            "Failed fleet listings",
        ))?;
        registry.register(Box::new(list_failures.clone()))?;

        let acknowledgements = IntCounterVec::new(
            Opts::new(
                "cadence_acknowledgements_total",
                "Attempts to withdraw the reboot grant from rebooted nodes",
            ),
            &["result"],
        )?;
        registry.register(Box::new(acknowledgements.clone()))?;

        let coordinations = IntCounterVec::new(
            Opts::new("cadence_coordinations_total", "Finished reboot coordinations"),
            &["outcome"],
        )?;
        registry.register(Box::new(coordinations.clone()))?;

        let coordination_duration = HistogramVec::new(
            HistogramOpts::new(
                "cadence_coordination_duration_seconds",
                "Time from reboot grant to coordination outcome",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["outcome"],
        )?;
        registry.register(Box::new(coordination_duration.clone()))?;

        Ok(Self {
            iterations,
            list_failures,
            acknowledgements,
            coordinations,
            coordination_duration,
            registry,
        })
    }

    /// Register the operator metrics in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render all metrics in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_iteration(&self) {
        self.iterations.inc();
    }

    fn record_list_failure(&self) {
        self.list_failures.inc();
    }

    fn record_acknowledge(&self, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        self.acknowledgements.with_label_values(&[result]).inc();
    }

    fn record_coordination(&self, outcome: &CoordinationOutcome, duration_ms: u64) {
        let label = outcome.as_label();
        self.coordinations.with_label_values(&[label]).inc();
        self.coordination_duration
            .with_label_values(&[label])
            .observe(duration_ms as f64 / 1000.0);
    }
}
