//! Utilization averaging and tracking-error integration

use chrono::{DateTime, Utc};

use crate::models::{seconds_between, Timeline};

use super::stats::time_weighted_mean;

/// Default HPA target utilization (percent)
const DEFAULT_TARGET_PERCENT: f64 = 60.0;

/// Integrates CPU utilization against the autoscaler's target
pub struct UtilizationIntegrator {
    pub target_percent: f64,
}

impl UtilizationIntegrator {
    pub fn new(target_percent: f64) -> Self {
        Self { target_percent }
    }

    /// Time-weighted mean utilization
    ///
    /// Restricted to samples at or after `stabilized_start` when given, otherwise over
    /// the whole run. Non-numeric readings are excluded rather than counted as zero.
    pub fn average(
        &self,
        timeline: &Timeline,
        stabilized_start: Option<DateTime<Utc>>,
    ) -> Option<f64> {
        let points: Vec<(DateTime<Utc>, f64)> = timeline
            .utilization_points()
            .into_iter()
            .filter(|(ts, _)| stabilized_start.map_or(true, |start| *ts >= start))
            .collect();
        time_weighted_mean(&points)
    }

    /// Cumulative `|utilization - target| * dt` over the run
    ///
    /// Left-open rectangle rule: each interval is charged with the later sample's
    /// deviation. Samples without a numeric reading add nothing but still advance
    /// the interval start. `None` when the run has no numeric utilization at all.
    pub fn tracking_error_area(&self, timeline: &Timeline) -> Option<f64> {
        if timeline.utilization_points().is_empty() {
            return None;
        }

        let samples = timeline.samples();
        let mut prev_time = samples.first()?.timestamp;
        let mut area = 0.0;

        for sample in samples {
            let dt = seconds_between(prev_time, sample.timestamp);
            if let Some(util) = sample
                .current_cpu_utilization_percent
                .filter(|v| v.is_finite())
            {
                area += (util - self.target_percent).abs() * dt;
            }
            prev_time = sample.timestamp;
        }

        Some(area)
    }
}

impl Default for UtilizationIntegrator {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_PERCENT)
    }
}
