use thiserror::Error;

use crate::desc::MetricKind;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    #[error("metric '{0}' already exists")]
    Duplicate(String),

    #[error("metric type '{0}' does not exist")]
    UnknownKind(MetricKind),

    #[error("metric '{0}' is histogram type and requires buckets")]
    MissingBuckets(String),

    #[error("metric '{0}' has buckets that are not strictly increasing")]
    InvalidBuckets(String),

    #[error("metric '{0}' is summary type and requires objectives")]
    MissingObjectives(String),

    #[error("metric '{name}' has invalid objective {quantile}:{error} (both must be within 0..=1)")]
    InvalidObjective {
        name: String,
        quantile: f64,
        error: f64,
    },

    #[error("metric '{name}' is {actual} type, '{op}' requires {expected}")]
    WrongKind {
        name: String,
        op: &'static str,
        actual: MetricKind,
        expected: &'static str,
    },

    #[error("metric '{0}' does not exist")]
    NotExist(String),

    #[error("metric '{name}' expects {expected} label values, got {got}")]
    LabelCardinality {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("counter '{name}' cannot be decreased (got {value})")]
    NegativeIncrement { name: String, value: f64 },

    #[error("metric '{0}' cannot record a NaN sample")]
    NanSample(String),

    #[error("collector error: {0}")]
    Collector(#[from] prometheus::Error),
}

impl MonitorError {
    /// Returns `true` for mistakes in metric definitions.
    ///
    /// These surface from [`crate::Monitor::add_metric`] and should stop the process before it starts serving.
    /// Everything else is raised by a single mutation call and can be logged and skipped.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MonitorError::InvalidMetric(_)
                | MonitorError::Duplicate(_)
                | MonitorError::UnknownKind(_)
                | MonitorError::MissingBuckets(_)
                | MonitorError::InvalidBuckets(_)
                | MonitorError::MissingObjectives(_)
                | MonitorError::InvalidObjective { .. }
                | MonitorError::Collector(_)
        )
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
