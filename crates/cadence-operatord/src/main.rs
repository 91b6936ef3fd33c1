use std::sync::Arc;

use tracing::info;

use cadence_core::{OperatorContext, metrics::MetricsHandle};
use cadence_kube::{KubeEvents, KubeNodes};
use cadence_observe::{LogTimeZone, Subscriber, init_local_offset, init_logger};
use cadence_prometheus::PrometheusMetrics;
use taskvisor::{Config as SupervisorConfig, Subscribe, Supervisor};

mod config;
mod http;
mod tasks;

use config::DaemonConfig;

fn main() -> anyhow::Result<()> {
    let cfg = DaemonConfig::from_env()?;

    // Offset detection must happen before the runtime starts its worker threads.
    if cfg.logger.tz == LogTimeZone::Local {
        init_local_offset();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cfg))
}

async fn run(cfg: DaemonConfig) -> anyhow::Result<()> {
    // 1) logger
    init_logger(&cfg.logger)?;
    info!(
        timeout_secs = cfg.operator.reboot_timeout_secs,
        max_concurrent = cfg.operator.max_concurrent_reboots,
        "starting reboot operator"
    );

    // 2) cluster access
    let client = kube::Client::try_default().await?;
    let nodes = Arc::new(KubeNodes::new(client.clone()));
    let events = Arc::new(KubeEvents::new(client, cfg.operator.reporter.clone()));

    // 3) metrics
    let metrics = Arc::new(PrometheusMetrics::new()?);
    let handle: MetricsHandle = metrics.clone();

    // 4) context
    let ctx = OperatorContext::new(nodes, events)
        .with_config(cfg.operator.clone())
        .with_metrics(handle);

    // 5) supervised tasks
    let mut specs = vec![tasks::operator(ctx)];
    if let Some(addr) = cfg.metrics_addr {
        specs.push(tasks::metrics_server(addr, metrics));
    }

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Subscriber)];
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subscribers)
        .build();

    sup.run(specs)
        .await
        .map_err(|e| anyhow::anyhow!("supervisor exited with error: {e}"))?;
    info!("reboot operator stopped");
    Ok(())
}
