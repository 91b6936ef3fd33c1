//! Supervised tasks of the daemon.
use std::{net::SocketAddr, sync::Arc, time::Duration};

use taskvisor::{BackoffPolicy, JitterPolicy, RestartPolicy, TaskError, TaskFn, TaskRef, TaskSpec};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use cadence_core::{OperatorContext, operator::Operator};
use cadence_prometheus::PrometheusMetrics;

use crate::http;

pub const OPERATOR_TASK: &str = "cadence-operator";
pub const METRICS_TASK: &str = "cadence-metrics";

/// Restart with backoff from 1s up to 1 minute.
fn restart_backoff() -> BackoffPolicy {
    BackoffPolicy {
        success_delay: None,
        jitter: JitterPolicy::Equal,
        factor: 2.0,

        first: Duration::from_secs(1),
        max: Duration::from_secs(60),
    }
}

/// The reconciliation loop. Runs until the supervisor cancels it.
pub fn operator(ctx: OperatorContext) -> TaskSpec {
    let task: TaskRef = TaskFn::arc(OPERATOR_TASK, move |cancel: CancellationToken| {
        let ctx = ctx.clone();
        async move {
            let mut operator = Operator::new(ctx).map_err(|e| TaskError::Fatal {
                reason: e.to_string(),
            })?;
            operator.run(cancel).await;
            Err::<(), _>(TaskError::Canceled)
        }
    });

    TaskSpec::new(task, RestartPolicy::Always, restart_backoff(), None)
}

/// `/metrics` and `/healthz` on `addr`.
pub fn metrics_server(addr: SocketAddr, metrics: Arc<PrometheusMetrics>) -> TaskSpec {
    let task: TaskRef = TaskFn::arc(METRICS_TASK, move |cancel: CancellationToken| {
        let metrics = Arc::clone(&metrics);
        async move {
            let listener = TcpListener::bind(addr).await.map_err(|e| TaskError::Fail {
                reason: format!("failed to bind {addr}: {e}"),
            })?;
            info!(%addr, "serving metrics");

            axum::serve(listener, http::router(metrics))
                .with_graceful_shutdown(cancel.cancelled_owned())
                .await
                .map_err(|e| TaskError::Fail {
                    reason: format!("metrics server failed: {e}"),
                })?;
            Err::<(), _>(TaskError::Canceled)
        }
    });

    TaskSpec::new(task, RestartPolicy::Always, restart_backoff(), None)
}
