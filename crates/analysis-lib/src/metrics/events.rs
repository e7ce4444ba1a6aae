//! Load-increase and scale-up event detection

use chrono::{DateTime, Utc};

use crate::error::{AnalysisError, Result};
use crate::models::{seconds_between, StreamKind, Timeline};

/// The autoscaler's first reaction to the load increase
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleUpEvent {
    /// First `high`/`start` phase marker
    pub anchor: DateTime<Utc>,
    /// Timestamp of the first sample with more replicas than the run started with
    pub reacted_at: DateTime<Utc>,
    pub initial_replicas: u32,
    pub scaled_replicas: u32,
}

impl ScaleUpEvent {
    pub fn delay_secs(&self) -> f64 {
        seconds_between(self.anchor, self.reacted_at)
    }
}

/// Find the first replica increase strictly after the load-increase anchor
///
/// # Returns
/// * `Ok(Some(event))` when the autoscaler reacted
/// * `Ok(None)` when it never scaled above the initial replica count
/// * `Err(UndefinedAnchor)` when no high phase was recorded
/// * `Err(MissingStream)` when there are no autoscaler samples
pub fn detect_scale_up(
    timeline: &Timeline,
    anchor: Option<DateTime<Utc>>,
) -> Result<Option<ScaleUpEvent>> {
    let initial = timeline
        .first()
        .ok_or(AnalysisError::MissingStream(StreamKind::Autoscaler))?
        .current_replicas;
    let anchor = anchor.ok_or(AnalysisError::UndefinedAnchor)?;

    let event = timeline
        .samples()
        .iter()
        .filter(|sample| sample.timestamp > anchor)
        .find(|sample| sample.current_replicas > initial)
        .map(|sample| ScaleUpEvent {
            anchor,
            reacted_at: sample.timestamp,
            initial_replicas: initial,
            scaled_replicas: sample.current_replicas,
        });

    Ok(event)
}
