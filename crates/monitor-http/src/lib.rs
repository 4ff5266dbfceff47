//! HTTP exposition for a [`monitor_core::Monitor`].
//!
//! Serves the Prometheus text format on a configurable path and port and, when enabled,
//! a `/debug/pprof/*` tree backed by a pluggable [`Profiler`].
//!
//! ## Example
//! ```rust,no_run
//! use monitor_core::{MetricDesc, Monitor};
//! use monitor_http::{serve, with_path, with_port};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = Monitor::new();
//! let hits = monitor.add_metric(MetricDesc::counter("hits_total"))?;
//!
//! let server = serve(monitor.registry().clone(), [with_port(9100), with_path("/metrics")]).await?;
//! hits.inc(&[])?;
//!
//! server.wait().await?;
//! # Ok(())
//! # }
//! ```
//!
//! To mount the scrape endpoint into an existing axum application use [`metrics_router`].

mod config;
pub use config::{
    ConfigOption, DEFAULT_PATH, DEFAULT_PORT, HttpConfig, PPROF_PREFIX, with_continue_on_error,
    with_host, with_path, with_port, with_profiling,
};

mod error;
pub use error::{HttpError, HttpResult};

pub mod exporter;
pub use exporter::Exporter;

pub mod profiling;
pub use profiling::{NoopProfiler, Profiler, ProfilerHandle};

mod server;
pub use server::{ServerHandle, metrics_router, router, serve, serve_with};
