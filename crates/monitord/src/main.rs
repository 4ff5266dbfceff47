use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use monitor_core::{MetricDesc, Monitor};
use monitor_http::{NoopProfiler, serve_with};
use monitor_observe::init_logger;

mod config;
use config::DaemonConfig;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) config (file, then MONITORD_HTTP_* overrides) + logger
    let cfg = DaemonConfig::from_env()?;
    init_logger(&cfg.logger)?;
    info!(
        path = %cfg.http.path,
        host = %cfg.http.host,
        port = cfg.http.port,
        profiling = cfg.http.profiling,
        "logger initialized"
    );

    // 2) metrics; any definition error stops the daemon here
    let monitor = Arc::new(Monitor::new());
    register_metrics(&monitor)?;
    info!(metrics = ?monitor.metric_names(), "metrics registered");

    // 3) exposition
    let server = serve_with(
        monitor.registry().clone(),
        cfg.http.clone(),
        Arc::new(NoopProfiler),
    )
    .await?;

    // 4) synthetic workload
    let workload = tokio::spawn(drive(monitor.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    workload.abort();
    server.stop().await?;
    Ok(())
}

fn register_metrics(monitor: &Monitor) -> anyhow::Result<()> {
    monitor.add_metric(
        MetricDesc::counter("requests_total")
            .namespace("api")
            .help("Requests handled")
            .labels(["method"]),
    )?;
    monitor.add_metric(
        MetricDesc::gauge("queue_depth")
            .namespace("api")
            .help("Requests waiting"),
    )?;
    monitor.add_metric(
        MetricDesc::histogram("latency_ms")
            .namespace("api")
            .help("Request latency in milliseconds")
            .labels(["method"])
            .buckets([10.0, 50.0, 100.0, 250.0, 500.0]),
    )?;
    monitor.add_metric(
        MetricDesc::summary("payload_bytes")
            .namespace("api")
            .help("Request payload size")
            .objectives([(0.5, 0.05), (0.9, 0.01), (0.99, 0.001)]),
    )?;
    Ok(())
}

async fn drive(monitor: Arc<Monitor>) {
    let mut tick = tokio::time::interval(Duration::from_millis(250));
    let mut n: u64 = 0;

    loop {
        tick.tick().await;
        n += 1;

        let method = if n % 3 == 0 { "POST" } else { "GET" };
        let latency = (n * 37 % 400) as f64;
        let updates = [
            monitor
                .get_metric("requests_total")
                .map(|m| m.inc(&[method])),
            monitor
                .get_metric("queue_depth")
                .map(|m| m.set_gauge_value(&[], (n % 10) as f64)),
            monitor
                .get_metric("latency_ms")
                .map(|m| m.observe(&[method], latency)),
            monitor
                .get_metric("payload_bytes")
                .map(|m| m.observe(&[], (n * 113 % 4096) as f64)),
        ];

        for res in updates.into_iter().flatten() {
            if let Err(e) = res {
                warn!(error = %e, "metric update failed");
            }
        }
    }
}
