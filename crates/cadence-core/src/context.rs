use std::{fmt, sync::Arc};

use crate::{
    config::OperatorConfig,
    event::EventSink,
    metrics::{MetricsHandle, noop_metrics},
    repository::NodeRepository,
};

/// Dependencies of the operator, built once at start-up and threaded through
/// the loop and the coordination protocol.
#[derive(Clone)]
pub struct OperatorContext {
    repository: Arc<dyn NodeRepository>,
    events: Arc<dyn EventSink>,
    metrics: MetricsHandle,
    config: OperatorConfig,
}

impl OperatorContext {
    /// Create a context with default configuration and no-op metrics.
    pub fn new(repository: Arc<dyn NodeRepository>, events: Arc<dyn EventSink>) -> Self {
        Self {
            repository,
            events,
            metrics: noop_metrics(),
            config: OperatorConfig::default(),
        }
    }

    /// Fleet state store.
    pub fn repository(&self) -> &Arc<dyn NodeRepository> {
        &self.repository
    }

    /// Event sink.
    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Get a clonable handle to the metrics backend.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Replace the metrics backend and return updated context.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replace the configuration and return updated context.
    pub fn with_config(mut self, config: OperatorConfig) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for OperatorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorContext")
            .field("repository", &"<repository>")
            .field("events", &"<sink>")
            .field("metrics", &"<handle>")
            .field("config", &self.config)
            .finish()
    }
}

impl fmt::Display for OperatorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OperatorContext(timeout={}s, concurrency={})",
            self.config.reboot_timeout_secs, self.config.max_concurrent_reboots
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LogSink;
    use crate::memory::MemoryFleet;

    fn ctx() -> OperatorContext {
        OperatorContext::new(Arc::new(MemoryFleet::new()), Arc::new(LogSink))
    }

    #[test]
    fn new_uses_default_config() {
        assert_eq!(ctx().config(), &OperatorConfig::default());
    }

    #[test]
    fn with_config_replaces_existing_config() {
        let cfg = OperatorConfig {
            max_concurrent_reboots: 3,
            ..Default::default()
        };
        let ctx = ctx().with_config(cfg.clone());
        assert_eq!(ctx.config(), &cfg);
    }

    #[test]
    fn display_includes_timeout_and_concurrency() {
        assert_eq!(
            ctx().to_string(),
            "OperatorContext(timeout=3600s, concurrency=1)"
        );
    }
}
