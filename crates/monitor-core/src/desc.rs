use std::fmt;

/// Kind of a metric.
///
/// `None` is the "no such metric" sentinel: it is the default for a fresh
/// descriptor and is never the kind of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MetricKind {
    /// Unset kind.
    #[default]
    None,
    /// Monotonic counter.
    Counter,
    /// Value that can go up and down.
    Gauge,
    /// Bucketed distribution.
    Histogram,
    /// Quantile distribution.
    Summary,
}

impl MetricKind {
    /// Return lowercase name of the kind.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::None => "none",
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a single metric.
///
/// Built with the kind-specific constructors and the chained setters, then handed to [`crate::Monitor::add_metric`]:
/// ```rust
/// use monitor_core::MetricDesc;
///
/// let desc = MetricDesc::histogram("latency_ms")
///     .namespace("api")
///     .help("Request latency in milliseconds")
///     .labels(["method"])
///     .buckets([10.0, 50.0, 100.0]);
/// assert_eq!(desc.labels, vec!["method".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricDesc {
    pub kind: MetricKind,
    /// Prefix of the exported name, may be empty.
    pub namespace: String,
    /// Unique across the whole monitor, not only within a namespace.
    pub name: String,
    pub help: String,
    /// Label names; values are matched by position.
    pub labels: Vec<String>,
    /// Upper bounds, histogram only.
    pub buckets: Vec<f64>,
    /// `(quantile, allowed error)` pairs, summary only.
    pub objectives: Vec<(f64, f64)>,
}

impl MetricDesc {
    /// Create a descriptor of the given kind.
    pub fn new(kind: MetricKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Counter descriptor.
    ///
    /// # Examples
    /// ```
    /// use monitor_core::{MetricDesc, MetricKind};
    ///
    /// let desc = MetricDesc::counter("requests_total");
    /// assert_eq!(desc.kind, MetricKind::Counter);
    /// assert!(desc.labels.is_empty());
    /// ```
    pub fn counter(name: impl Into<String>) -> Self {
        Self::new(MetricKind::Counter, name)
    }

    pub fn gauge(name: impl Into<String>) -> Self {
        Self::new(MetricKind::Gauge, name)
    }

    /// Histogram descriptor; registration fails until [`MetricDesc::buckets`] is set.
    pub fn histogram(name: impl Into<String>) -> Self {
        Self::new(MetricKind::Histogram, name)
    }

    /// Summary descriptor; registration fails until [`MetricDesc::objectives`] is set.
    pub fn summary(name: impl Into<String>) -> Self {
        Self::new(MetricKind::Summary, name)
    }

    /// Prefix of the exported name.
    ///
    /// The namespace does not take part in name uniqueness: `api/requests_total` and
    /// `admin/requests_total` collide inside one monitor.
    ///
    /// # Examples
    /// ```
    /// use monitor_core::{MetricDesc, Monitor};
    ///
    /// let monitor = Monitor::new();
    /// monitor
    ///     .add_metric(MetricDesc::counter("requests_total").namespace("api"))
    ///     .unwrap();
    /// assert_eq!(monitor.get_metric("requests_total").unwrap().desc().namespace, "api");
    /// ```
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Help text; the name is exported instead when left empty.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Label names, replacing any set before.
    ///
    /// Mutations must pass exactly one value per name, in this order.
    ///
    /// # Examples
    /// ```
    /// use monitor_core::{MetricDesc, Monitor, MonitorError};
    ///
    /// let monitor = Monitor::new();
    /// let m = monitor
    ///     .add_metric(MetricDesc::counter("requests_total").labels(["method", "code"]))
    ///     .unwrap();
    /// m.inc(&["GET", "200"]).unwrap();
    /// assert!(matches!(m.inc(&["GET"]), Err(MonitorError::LabelCardinality { .. })));
    /// ```
    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Histogram upper bounds, strictly increasing. `+Inf` is implicit.
    pub fn buckets(mut self, buckets: impl IntoIterator<Item = f64>) -> Self {
        self.buckets = buckets.into_iter().collect();
        self
    }

    /// Summary `(quantile, allowed error)` pairs, both within `0..=1`.
    pub fn objectives(mut self, objectives: impl IntoIterator<Item = (f64, f64)>) -> Self {
        self.objectives = objectives.into_iter().collect();
        self
    }

    /// Help text handed to the collector.
    ///
    /// Prometheus rejects empty help strings, so the name stands in when none was given.
    pub(crate) fn help_or_name(&self) -> &str {
        if self.help.is_empty() {
            &self.name
        } else {
            &self.help
        }
    }

    pub(crate) fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(String::as_str).collect()
    }
}
