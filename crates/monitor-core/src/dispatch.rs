//! Kind dispatch: maps a [`MetricKind`] to the constructor of its collector.
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, core::Collector as _};

use crate::{
    desc::{MetricDesc, MetricKind},
    error::{MonitorError, MonitorResult},
    summary::SummaryVec,
};

/// Typed collector backing a metric.
#[derive(Clone)]
pub enum Collector {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
    Summary(SummaryVec),
}

impl Collector {
    /// Kind this collector implements.
    pub fn kind(&self) -> MetricKind {
        match self {
            Collector::Counter(_) => MetricKind::Counter,
            Collector::Gauge(_) => MetricKind::Gauge,
            Collector::Histogram(_) => MetricKind::Histogram,
            Collector::Summary(_) => MetricKind::Summary,
        }
    }

    /// Boxed clone suitable for [`prometheus::Registry::register`].
    pub(crate) fn boxed(&self) -> Box<dyn prometheus::core::Collector> {
        match self {
            Collector::Counter(c) => Box::new(c.clone()),
            Collector::Gauge(g) => Box::new(g.clone()),
            Collector::Histogram(h) => Box::new(h.clone()),
            Collector::Summary(s) => Box::new(s.clone()),
        }
    }

    /// Fully-qualified exported name.
    pub fn fq_name(&self) -> String {
        let descs = match self {
            Collector::Counter(c) => c.desc(),
            Collector::Gauge(g) => g.desc(),
            Collector::Histogram(h) => h.desc(),
            Collector::Summary(s) => s.desc(),
        };
        descs
            .first()
            .map(|d| d.fq_name.clone())
            .unwrap_or_default()
    }
}

/// Builds the collector for a descriptor of one particular kind.
pub type Constructor = fn(&MetricDesc) -> MonitorResult<Collector>;

/// Return the constructor registered for `kind`.
///
/// `MetricKind::None` has no entry.
pub fn constructor(kind: MetricKind) -> Option<Constructor> {
    match kind {
        MetricKind::Counter => Some(counter),
        MetricKind::Gauge => Some(gauge),
        MetricKind::Histogram => Some(histogram),
        MetricKind::Summary => Some(summary),
        MetricKind::None => None,
    }
}

/// Build the collector for `desc`, failing with [`MonitorError::UnknownKind`] on a dispatch miss.
pub fn build(desc: &MetricDesc) -> MonitorResult<Collector> {
    let ctor = constructor(desc.kind).ok_or(MonitorError::UnknownKind(desc.kind))?;
    ctor(desc)
}

fn opts(desc: &MetricDesc) -> Opts {
    Opts::new(desc.name.clone(), desc.help_or_name()).namespace(desc.namespace.clone())
}

fn counter(desc: &MetricDesc) -> MonitorResult<Collector> {
    let vec = CounterVec::new(opts(desc), &desc.label_names())?;
    Ok(Collector::Counter(vec))
}

fn gauge(desc: &MetricDesc) -> MonitorResult<Collector> {
    let vec = GaugeVec::new(opts(desc), &desc.label_names())?;
    Ok(Collector::Gauge(vec))
}

fn histogram(desc: &MetricDesc) -> MonitorResult<Collector> {
    if desc.buckets.is_empty() {
        return Err(MonitorError::MissingBuckets(desc.name.clone()));
    }
    // Children are built lazily by prometheus, so bucket order is only checked there on first use.
    if desc.buckets.windows(2).any(|w| !(w[0] < w[1])) {
        return Err(MonitorError::InvalidBuckets(desc.name.clone()));
    }
    let vec = HistogramVec::new(
        HistogramOpts::from(opts(desc)).buckets(desc.buckets.clone()),
        &desc.label_names(),
    )?;
    Ok(Collector::Histogram(vec))
}

fn summary(desc: &MetricDesc) -> MonitorResult<Collector> {
    if desc.objectives.is_empty() {
        return Err(MonitorError::MissingObjectives(desc.name.clone()));
    }
    let out_of_range = |v: f64| !(0.0..=1.0).contains(&v);
    if let Some(&(quantile, error)) = desc
        .objectives
        .iter()
        .find(|(q, e)| out_of_range(*q) || out_of_range(*e))
    {
        return Err(MonitorError::InvalidObjective {
            name: desc.name.clone(),
            quantile,
            error,
        });
    }

    let vec = SummaryVec::new(
        opts(desc).variable_labels(desc.labels.clone()),
        &desc.objectives,
    )?;
    Ok(Collector::Summary(vec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_has_no_constructor() {
        assert!(constructor(MetricKind::None).is_none());
        let err = build(&MetricDesc::new(MetricKind::None, "x")).err().unwrap();
        assert!(matches!(err, MonitorError::UnknownKind(MetricKind::None)));
    }

    #[test]
    fn builds_matching_variant_for_every_kind() {
        let descs = [
            MetricDesc::counter("c"),
            MetricDesc::gauge("g"),
            MetricDesc::histogram("h").buckets([1.0]),
            MetricDesc::summary("s").objectives([(0.5, 0.05)]),
        ];
        for desc in descs {
            let collector = build(&desc).unwrap();
            assert_eq!(collector.kind(), desc.kind);
        }
    }

    #[test]
    fn histogram_requires_buckets() {
        let err = build(&MetricDesc::histogram("latency_ms")).err().unwrap();
        assert!(matches!(err, MonitorError::MissingBuckets(name) if name == "latency_ms"));
    }

    #[test]
    fn summary_requires_objectives() {
        let err = build(&MetricDesc::summary("rpc_seconds")).err().unwrap();
        assert!(matches!(err, MonitorError::MissingObjectives(name) if name == "rpc_seconds"));
    }

    #[test]
    fn summary_rejects_out_of_range_objective() {
        let desc = MetricDesc::summary("rpc_seconds").objectives([(0.5, 0.05), (1.5, 0.01)]);
        let err = build(&desc).err().unwrap();
        assert!(matches!(err, MonitorError::InvalidObjective { quantile, .. } if quantile == 1.5));
    }

    #[test]
    fn histogram_rejects_unsorted_buckets() {
        let desc = MetricDesc::histogram("latency_ms").buckets([50.0, 10.0]);
        let err = build(&desc).err().unwrap();
        assert!(matches!(err, MonitorError::InvalidBuckets(name) if name == "latency_ms"));

        let desc = MetricDesc::histogram("latency_ms").buckets([10.0, 10.0]);
        assert!(matches!(build(&desc), Err(MonitorError::InvalidBuckets(_))));
    }

    #[test]
    fn invalid_label_name_is_collector_error() {
        let desc = MetricDesc::counter("requests_total").labels(["bad-label"]);
        assert!(matches!(build(&desc), Err(MonitorError::Collector(_))));
    }

    #[test]
    fn namespace_prefixes_exported_name() {
        let collector = build(&MetricDesc::counter("requests_total").namespace("api")).unwrap();
        assert_eq!(collector.fq_name(), "api_requests_total");

        let collector = build(&MetricDesc::counter("requests_total")).unwrap();
        assert_eq!(collector.fq_name(), "requests_total");
    }
}
