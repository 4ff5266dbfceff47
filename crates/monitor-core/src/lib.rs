//! Named metric registry on top of the `prometheus` crate.
//!
//! A [`Monitor`] owns a [`prometheus::Registry`] and a name → [`Metric`] map.
//! Applications describe metrics with [`MetricDesc`], register them once at startup and then mutate the returned handles from any thread.
//!
//! ## Example
//! ```rust
//! use monitor_core::{MetricDesc, Monitor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = Monitor::new();
//!
//! let requests = monitor.add_metric(
//!     MetricDesc::counter("requests_total")
//!         .namespace("api")
//!         .help("Total requests")
//!         .labels(["method"]),
//! )?;
//! requests.inc(&["GET"])?;
//!
//! // later, anywhere else
//! let latency = monitor.add_metric(
//!     MetricDesc::histogram("latency_ms").buckets([10.0, 50.0, 100.0]),
//! )?;
//! latency.observe(&[], 42.0)?;
//!
//! assert!(monitor.get_metric("requests_total").is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//! Registration mistakes (empty or duplicate name, `MetricKind::None`, missing buckets or objectives)
//! come back from [`Monitor::add_metric`] and are meant to stop the process at startup.
//! Mutation mistakes (wrong kind, wrong number of label values) come back from the individual call and are recoverable.
//! [`MonitorError::is_config_error`] tells the two apart.

mod desc;
pub use desc::{MetricDesc, MetricKind};

pub mod dispatch;
pub use dispatch::Collector;

mod error;
pub use error::{MonitorError, MonitorResult};

mod metric;
pub use metric::Metric;

mod monitor;
pub use monitor::Monitor;

mod summary;
pub use summary::{SUMMARY_MAX_SAMPLES, SummaryChild, SummaryVec};

pub use prometheus::Registry;
