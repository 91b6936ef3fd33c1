//! Prometheus backend for the operator metrics.
//!
//! ## Metrics
//! - `cadence_iterations_total` - Counter
//! - `cadence_list_failures_total` - Counter
//! - `cadence_acknowledgements_total{result}` - Counter, `result` is `ok` or `error`
//! - `cadence_coordinations_total{outcome}` - Counter
//! - `cadence_coordination_duration_seconds{outcome}` - Histogram
//!
//! This crate does not serve HTTP; [`PrometheusMetrics::encode`] renders the
//! text exposition format for whatever server the binary runs.
//!
//! ```rust
//! use std::sync::Arc;
//! use cadence_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: cadence_core::metrics::MetricsHandle = Arc::new(metrics.clone());
//! # let _ = handle;
//! let body = metrics.encode()?;
//! assert!(body.contains("cadence_iterations_total"));
//! # Ok(())
//! # }
//! ```
mod backend;
pub use backend::PrometheusMetrics;
