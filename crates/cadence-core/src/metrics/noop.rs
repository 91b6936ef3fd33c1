use crate::coordinator::CoordinationOutcome;
use crate::metrics::backend::MetricsBackend;

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_iteration(&self) {}

    #[inline(always)]
    fn record_list_failure(&self) {}

    #[inline(always)]
    fn record_acknowledge(&self, _: bool) {}

    #[inline(always)]
    fn record_coordination(&self, _: &CoordinationOutcome, _: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_metrics_is_zero_size() {
        assert_eq!(std::mem::size_of::<NoOpMetrics>(), 0);
    }

    #[test]
    fn noop_can_be_called_repeatedly() {
        let metrics = NoOpMetrics;
        for _ in 0..1000 {
            metrics.record_iteration();
            metrics.record_list_failure();
            metrics.record_acknowledge(true);
            metrics.record_coordination(&CoordinationOutcome::Completed, 100);
        }
    }
}
