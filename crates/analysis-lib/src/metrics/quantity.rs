//! CPU quantity normalization
//!
//! The metrics API reports pod CPU either as integer millicores (`"250m"`) or as a
//! decimal count of whole cores (`"1"`, `"0.25"`). Both are normalized to millicores
//! before any aggregation.

use crate::error::{AnalysisError, Result};
use crate::models::PodCpuSample;

use super::stats::{round_to, sample_std_dev};

/// Suffix marking a quantity already expressed in millicores
pub const MILLI_SUFFIX: char = 'm';

/// Parse a raw CPU quantity into millicores
pub fn parse_cpu_millis(raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    let malformed = || AnalysisError::MalformedQuantity(raw.to_string());

    if let Some(millis) = trimmed.strip_suffix(MILLI_SUFFIX) {
        return millis.parse::<i64>().map_err(|_| malformed());
    }

    let cores: f64 = trimmed.parse().map_err(|_| malformed())?;
    let millis = (cores * 1000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return Err(malformed());
    }
    Ok(millis as i64)
}

/// Dispersion of per-pod CPU readings
#[derive(Debug, Clone, PartialEq)]
pub struct CpuDispersion {
    /// Sample standard deviation in millicores, rounded to one decimal
    pub std_dev_millis: Option<f64>,
    pub parsed: usize,
    pub malformed: usize,
}

/// Standard deviation of all well-formed readings; malformed ones are skipped
pub fn pod_cpu_dispersion(samples: &[PodCpuSample]) -> CpuDispersion {
    let mut millis = Vec::with_capacity(samples.len());
    let mut malformed = 0;

    for sample in samples {
        match parse_cpu_millis(&sample.raw_cpu) {
            Ok(value) => millis.push(value as f64),
            Err(err) => {
                tracing::debug!(pod = %sample.pod_id, error = %err, "Skipping CPU reading");
                malformed += 1;
            }
        }
    }

    CpuDispersion {
        std_dev_millis: sample_std_dev(&millis).map(|sd| round_to(sd, 1)),
        parsed: millis.len(),
        malformed,
    }
}
