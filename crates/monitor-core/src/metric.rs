use std::sync::Arc;

use crate::{
    desc::{MetricDesc, MetricKind},
    dispatch::Collector,
    error::{MonitorError, MonitorResult},
};

/// Live handle of a registered metric.
///
/// Handles are only produced by [`crate::Monitor::add_metric`] and [`crate::Monitor::get_metric`],
/// so the collector behind a handle is always registered. Cloning is cheap; every clone mutates the same series.
///
/// All mutation methods take label values in the order the descriptor declared the label names.
#[derive(Clone)]
pub struct Metric {
    desc: Arc<MetricDesc>,
    collector: Collector,
}

impl Metric {
    pub(crate) fn new(desc: MetricDesc, collector: Collector) -> Self {
        Self {
            desc: Arc::new(desc),
            collector,
        }
    }

    /// Descriptor this metric was registered with.
    #[inline]
    pub fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    /// Registered name, without the namespace prefix.
    ///
    /// # Examples
    /// ```
    /// use monitor_core::{MetricDesc, Monitor};
    ///
    /// let monitor = Monitor::new();
    /// let m = monitor
    ///     .add_metric(MetricDesc::gauge("queue_depth").namespace("api"))
    ///     .unwrap();
    /// assert_eq!(m.name(), "queue_depth");
    /// assert_eq!(m.collector().fq_name(), "api_queue_depth");
    /// ```
    #[inline]
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// Kind of the metric; never [`MetricKind::None`] for a handle returned by the monitor.
    ///
    /// # Examples
    /// ```
    /// use monitor_core::{MetricDesc, MetricKind, Monitor};
    ///
    /// let monitor = Monitor::new();
    /// let m = monitor
    ///     .add_metric(MetricDesc::histogram("latency_ms").buckets([10.0, 50.0]))
    ///     .unwrap();
    /// assert_eq!(m.kind(), MetricKind::Histogram);
    /// ```
    #[inline]
    pub fn kind(&self) -> MetricKind {
        self.desc.kind
    }

    /// Underlying collector.
    #[inline]
    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Set the value of a gauge.
    pub fn set_gauge_value(&self, label_values: &[&str], value: f64) -> MonitorResult<()> {
        match self.active(label_values)? {
            Collector::Gauge(g) => g.get_metric_with_label_values(label_values)?.set(value),
            _ => return Err(self.wrong_kind("set_gauge_value", "gauge")),
        }
        Ok(())
    }

    /// Increment a counter or gauge by one.
    pub fn inc(&self, label_values: &[&str]) -> MonitorResult<()> {
        match self.active(label_values)? {
            Collector::Counter(c) => c.get_metric_with_label_values(label_values)?.inc(),
            Collector::Gauge(g) => g.get_metric_with_label_values(label_values)?.inc(),
            _ => return Err(self.wrong_kind("inc", "counter or gauge")),
        }
        Ok(())
    }

    /// Add `value` to a counter or gauge.
    ///
    /// Counters only move up: a negative or NaN `value` fails with [`MonitorError::NegativeIncrement`]
    /// and leaves the counter untouched. `+inf` is accepted.
    pub fn add(&self, label_values: &[&str], value: f64) -> MonitorResult<()> {
        match self.active(label_values)? {
            Collector::Counter(c) => {
                if value.is_nan() || value < 0.0 {
                    return Err(MonitorError::NegativeIncrement {
                        name: self.desc.name.clone(),
                        value,
                    });
                }
                c.get_metric_with_label_values(label_values)?.inc_by(value)
            }
            Collector::Gauge(g) => g.get_metric_with_label_values(label_values)?.add(value),
            _ => return Err(self.wrong_kind("add", "counter or gauge")),
        }
        Ok(())
    }

    /// Record one sample into a histogram or summary.
    ///
    /// A NaN sample fails with [`MonitorError::NanSample`] and is not recorded.
    /// Infinities are recorded; `+inf` lands in the `+Inf` bucket only.
    pub fn observe(&self, label_values: &[&str], value: f64) -> MonitorResult<()> {
        match self.active(label_values)? {
            Collector::Histogram(_) | Collector::Summary(_) if value.is_nan() => {
                return Err(MonitorError::NanSample(self.desc.name.clone()));
            }
            Collector::Histogram(h) => h.get_metric_with_label_values(label_values)?.observe(value),
            Collector::Summary(s) => s.get_metric_with_label_values(label_values)?.observe(value),
            _ => return Err(self.wrong_kind("observe", "histogram or summary")),
        }
        Ok(())
    }

    /// Common preconditions of every mutation.
    fn active(&self, label_values: &[&str]) -> MonitorResult<&Collector> {
        if self.desc.kind == MetricKind::None {
            return Err(MonitorError::NotExist(self.desc.name.clone()));
        }
        if label_values.len() != self.desc.labels.len() {
            return Err(MonitorError::LabelCardinality {
                name: self.desc.name.clone(),
                expected: self.desc.labels.len(),
                got: label_values.len(),
            });
        }
        Ok(&self.collector)
    }

    fn wrong_kind(&self, op: &'static str, expected: &'static str) -> MonitorError {
        MonitorError::WrongKind {
            name: self.desc.name.clone(),
            op,
            actual: self.desc.kind,
            expected,
        }
    }
}

impl std::fmt::Debug for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metric")
            .field("desc", &self.desc)
            .field("collector", &self.collector.kind())
            .finish()
    }
}
