//! Summary collector.
//!
//! The `prometheus` crate ships counters, gauges and histograms but no summary type.
//! [`SummaryVec`] fills that gap: it implements [`Collector`] so it registers into a [`prometheus::Registry`]
//! next to the stock vectors and is rendered by the stock `TextEncoder` (`{quantile="..."}`, `_sum`, `_count`).
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use prometheus::{
    Opts,
    core::{Collector, Desc},
    proto::{self, LabelPair, MetricFamily, MetricType, Quantile},
};

/// Number of most recent observations quantiles are computed over.
pub const SUMMARY_MAX_SAMPLES: usize = 500;

#[derive(Debug, Default)]
struct SummaryState {
    count: u64,
    sum: f64,
    window: VecDeque<f64>,
}

impl SummaryState {
    fn observe(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        if self.window.len() == SUMMARY_MAX_SAMPLES {
            self.window.pop_front();
        }
        self.window.push_back(v);
    }

    /// Nearest-rank quantiles over the current window, NaN when the window is empty.
    fn quantiles(&self, objectives: &[(f64, f64)]) -> Vec<(f64, f64)> {
        let mut sorted: Vec<f64> = self.window.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        objectives
            .iter()
            .map(|&(q, _)| {
                if sorted.is_empty() {
                    return (q, f64::NAN);
                }
                let rank = (q * sorted.len() as f64).ceil() as usize;
                let idx = rank.saturating_sub(1).min(sorted.len() - 1);
                (q, sorted[idx])
            })
            .collect()
    }
}

/// Single label combination of a [`SummaryVec`].
#[derive(Debug, Clone)]
pub struct SummaryChild {
    state: Arc<Mutex<SummaryState>>,
}

impl SummaryChild {
    /// Record one sample.
    pub fn observe(&self, v: f64) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(v);
    }

    /// Total number of observations.
    pub fn sample_count(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count
    }

    /// Sum of all observations.
    pub fn sample_sum(&self) -> f64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).sum
    }
}

struct SummaryCore {
    desc: Desc,
    objectives: Vec<(f64, f64)>,
    children: RwLock<HashMap<Vec<String>, SummaryChild>>,
}

/// Summary partitioned by label values.
///
/// Cloning is cheap and every clone observes into the same children.
#[derive(Clone)]
pub struct SummaryVec {
    core: Arc<SummaryCore>,
}

impl SummaryVec {
    /// Create a summary vector.
    ///
    /// `objectives` are `(quantile, allowed error)` pairs. They are sorted by quantile and deduplicated
    /// (the last error given for a quantile wins). Validation of the ranges belongs to the caller.
    pub fn new(opts: Opts, objectives: &[(f64, f64)]) -> prometheus::Result<Self> {
        let desc = Desc::new(
            opts.fq_name(),
            opts.help.clone(),
            opts.variable_labels.clone(),
            opts.const_labels.clone(),
        )?;

        let mut objectives = objectives.to_vec();
        objectives.reverse();
        objectives.sort_by(|a, b| a.0.total_cmp(&b.0));
        objectives.dedup_by(|a, b| a.0 == b.0);

        Ok(Self {
            core: Arc::new(SummaryCore {
                desc,
                objectives,
                children: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// Return the child for the given label values, creating it on first use.
    pub fn get_metric_with_label_values(&self, vals: &[&str]) -> prometheus::Result<SummaryChild> {
        let expect = self.core.desc.variable_labels.len();
        if vals.len() != expect {
            return Err(prometheus::Error::InconsistentCardinality {
                expect,
                got: vals.len(),
            });
        }
        let key: Vec<String> = vals.iter().map(|v| v.to_string()).collect();

        if let Some(child) = self
            .core
            .children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(child.clone());
        }

        let mut children = self
            .core
            .children
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let child = children.entry(key).or_insert_with(|| SummaryChild {
            state: Arc::new(Mutex::new(SummaryState::default())),
        });
        Ok(child.clone())
    }

    /// Objectives after normalization.
    pub fn objectives(&self) -> &[(f64, f64)] {
        &self.core.objectives
    }

    fn metric_for(&self, key: &[String], child: &SummaryChild) -> proto::Metric {
        let state = child.state.lock().unwrap_or_else(PoisonError::into_inner);

        let quantile = state
            .quantiles(&self.core.objectives)
            .into_iter()
            .map(|(q, v)| {
                let mut pb = Quantile::default();
                pb.set_quantile(q);
                pb.set_value(v);
                pb
            })
            .collect();

        let mut summary = proto::Summary::default();
        summary.set_sample_count(state.count);
        summary.set_sample_sum(state.sum);
        summary.quantile = quantile;

        let mut label: Vec<LabelPair> = self
            .core
            .desc
            .variable_labels
            .iter()
            .zip(key)
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                pair
            })
            .collect();
        label.sort_by(|a, b| a.name().cmp(b.name()));

        let mut metric = proto::Metric::default();
        metric.label = label;
        metric.summary = Some(summary).into();
        metric
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.core.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let children = self
            .core
            .children
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut family = MetricFamily::default();
        family.set_name(self.core.desc.fq_name.clone());
        family.set_help(self.core.desc.help.clone());
        family.set_type(MetricType::SUMMARY);
        family.metric = children
            .iter()
            .map(|(key, child)| self.metric_for(key, child))
            .collect();

        vec![family]
    }
}
