//! Error taxonomy for the analysis core
//!
//! Every variant except [`AnalysisError::NoUsableTelemetry`] and
//! [`AnalysisError::InvalidConfig`] is local to one metric: the summarizer maps it to an
//! absent field and moves on.

use crate::models::StreamKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A telemetry table required for a metric is absent or empty
    #[error("telemetry stream {0} is missing or empty")]
    MissingStream(StreamKind),

    /// A CPU quantity string is neither `<int>m` nor a decimal
    #[error("malformed CPU quantity {0:?}")]
    MalformedQuantity(String),

    /// No `high`/`start` phase marker to measure against
    #[error("no high-phase start event to anchor against")]
    UndefinedAnchor,

    /// Replica count never held steady long enough
    #[error("replica count never held steady for {threshold_secs}s")]
    NoPlateauFound { threshold_secs: f64 },

    /// Batch-level: not a single run could be analyzed
    #[error("no run has usable autoscaler telemetry")]
    NoUsableTelemetry,

    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
