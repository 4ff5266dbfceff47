use std::{
    collections::HashMap,
    sync::{OnceLock, PoisonError, RwLock},
};

use prometheus::Registry;
use tracing::{debug, instrument, warn};

use crate::{
    desc::MetricDesc,
    dispatch,
    error::{MonitorError, MonitorResult},
    metric::Metric,
};

/// Registry of named metrics on top of a [`prometheus::Registry`].
///
/// Names are unique across the whole monitor regardless of namespace.
/// The prometheus registry is shared with the exporter, which only reads from it at scrape time.
pub struct Monitor {
    metrics: RwLock<HashMap<String, Metric>>,
    registry: Registry,
}

impl Monitor {
    /// Create a monitor backed by a fresh private registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create a monitor backed by the given registry.
    ///
    /// `prometheus::Registry` is a cheap handle, so collectors registered here are visible through every clone of it.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
            registry,
        }
    }

    /// Process-wide monitor bound to [`prometheus::default_registry`].
    pub fn global() -> &'static Monitor {
        static GLOBAL: OnceLock<Monitor> = OnceLock::new();
        GLOBAL.get_or_init(|| Monitor::with_registry(prometheus::default_registry().clone()))
    }

    /// Underlying registry, for exposition.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a new metric and return its live handle.
    ///
    /// Errors (all of them configuration mistakes, see [`MonitorError::is_config_error`]):
    /// - [`MonitorError::InvalidMetric`] for an empty name;
    /// - [`MonitorError::Duplicate`] when the name is already taken;
    /// - [`MonitorError::UnknownKind`] for `MetricKind::None`;
    /// - kind-specific parameter errors from the dispatcher;
    /// - [`MonitorError::Collector`] when prometheus rejects the names or the registration.
    ///
    /// The duplicate check, collector construction, registration and insertion happen under one write lock,
    /// so concurrent calls with the same name have exactly one winner and a failed call registers nothing.
    #[instrument(level = "debug", skip(self, desc), fields(name = %desc.name, kind = %desc.kind))]
    pub fn add_metric(&self, desc: MetricDesc) -> MonitorResult<Metric> {
        if desc.name.is_empty() {
            warn!("rejected metric with empty name");
            return Err(MonitorError::InvalidMetric(
                "metric name cannot be empty".to_string(),
            ));
        }

        let mut metrics = self
            .metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if metrics.contains_key(&desc.name) {
            warn!("rejected duplicate metric");
            return Err(MonitorError::Duplicate(desc.name));
        }

        let collector = dispatch::build(&desc).inspect_err(|e| warn!(error = %e, "rejected metric"))?;
        self.registry
            .register(collector.boxed())
            .inspect_err(|e| warn!(error = %e, "collector registration failed"))?;

        debug!(fq_name = %collector.fq_name(), labels = ?desc.labels, "metric registered");

        let metric = Metric::new(desc, collector);
        metrics.insert(metric.name().to_string(), metric.clone());
        Ok(metric)
    }

    /// Look up a metric by name.
    pub fn get_metric(&self, name: &str) -> Option<Metric> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of all registered metrics, sorted.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}
