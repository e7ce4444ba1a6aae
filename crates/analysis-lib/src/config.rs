//! Analysis configuration

use crate::error::{AnalysisError, Result};
use crate::metrics::ThroughputSource;
use serde::{Deserialize, Serialize};

/// Tunables consumed by the derived-metrics pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Utilization the autoscaler was configured to hold, in percent
    #[serde(default = "default_target_utilization")]
    pub target_utilization_percent: f64,

    /// Minimum span of unchanged replica count that counts as stabilized
    #[serde(default = "default_plateau_threshold")]
    pub plateau_threshold_secs: f64,

    /// Nominal sampling interval used by the pod-seconds cost proxy
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,

    /// Throughput sources, most trusted first
    #[serde(default = "default_throughput_order")]
    pub throughput_order: Vec<ThroughputSource>,

    /// Measure time-to-stabilize from the first sample when no high phase was recorded
    #[serde(default)]
    pub anchor_fallback_to_run_start: bool,
}

fn default_target_utilization() -> f64 {
    60.0
}

fn default_plateau_threshold() -> f64 {
    60.0
}

fn default_sample_interval() -> u64 {
    5
}

fn default_throughput_order() -> Vec<ThroughputSource> {
    ThroughputSource::DEFAULT_ORDER.to_vec()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_utilization_percent: default_target_utilization(),
            plateau_threshold_secs: default_plateau_threshold(),
            sample_interval_secs: default_sample_interval(),
            throughput_order: default_throughput_order(),
            anchor_fallback_to_run_start: false,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.target_utilization_percent.is_finite() || self.target_utilization_percent < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "target utilization must be a non-negative number, got {}",
                self.target_utilization_percent
            )));
        }
        if !self.plateau_threshold_secs.is_finite() || self.plateau_threshold_secs < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "plateau threshold must be a non-negative number of seconds, got {}",
                self.plateau_threshold_secs
            )));
        }
        if self.throughput_order.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "throughput order needs at least one source".to_string(),
            ));
        }
        for (i, source) in self.throughput_order.iter().enumerate() {
            if self.throughput_order[..i].contains(source) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "throughput source {} listed twice",
                    source
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.target_utilization_percent, 60.0);
        assert_eq!(config.plateau_threshold_secs, 60.0);
        assert_eq!(config.sample_interval_secs, 5);
        assert_eq!(
            config.throughput_order,
            vec![
                ThroughputSource::DedicatedRate,
                ThroughputSource::HpaCustomMetric,
                ThroughputSource::DerivedCounterRate,
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"target_utilization_percent": 75.0}"#).unwrap();
        assert_eq!(config.target_utilization_percent, 75.0);
        assert_eq!(config.sample_interval_secs, 5);
    }

    #[test]
    fn test_rejects_duplicate_sources() {
        let config = AnalysisConfig {
            throughput_order: vec![
                ThroughputSource::HpaCustomMetric,
                ThroughputSource::HpaCustomMetric,
            ],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let config = AnalysisConfig {
            plateau_threshold_secs: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
