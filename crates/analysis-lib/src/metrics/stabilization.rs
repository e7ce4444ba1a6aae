//! Replica plateau detection
//!
//! Walks adjacent autoscaler samples looking for the first contiguous run of
//! unchanged replica count that spans at least the configured threshold. The first
//! qualifying plateau wins even if a longer one follows.

use chrono::{DateTime, Utc};

use crate::error::{AnalysisError, Result};
use crate::models::{seconds_between, StreamKind, Timeline};

/// Default plateau duration (1 minute)
const DEFAULT_THRESHOLD_SECS: f64 = 60.0;

/// Scan state while walking the replica trace
#[derive(Debug, Clone, Copy, PartialEq)]
enum PlateauState {
    Seeking,
    Confirming { start: DateTime<Utc> },
}

/// An accepted replica plateau
#[derive(Debug, Clone, PartialEq)]
pub struct Plateau {
    /// Timestamp of the first sample of the plateau
    pub start: DateTime<Utc>,
    /// Timestamp at which the plateau reached the threshold
    pub confirmed_at: DateTime<Utc>,
    pub replicas: u32,
}

impl Plateau {
    /// Offset of the plateau onset from the anchor, in seconds
    pub fn offset_from(&self, anchor: DateTime<Utc>) -> f64 {
        seconds_between(anchor, self.start)
    }
}

/// Detects when the replica count settled
pub struct StabilizationDetector {
    /// Minimum plateau span in seconds
    pub threshold_secs: f64,
}

impl StabilizationDetector {
    pub fn new(threshold_secs: f64) -> Self {
        Self { threshold_secs }
    }

    /// Find the first plateau spanning at least `threshold_secs`
    pub fn detect(&self, timeline: &Timeline) -> Result<Plateau> {
        if timeline.is_empty() {
            return Err(AnalysisError::MissingStream(StreamKind::Autoscaler));
        }

        let mut state = PlateauState::Seeking;

        for pair in timeline.samples().windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);

            if curr.current_replicas != prev.current_replicas {
                state = PlateauState::Seeking;
                continue;
            }

            let start = match state {
                PlateauState::Seeking => prev.timestamp,
                PlateauState::Confirming { start } => start,
            };
            state = PlateauState::Confirming { start };

            if seconds_between(start, curr.timestamp) >= self.threshold_secs {
                return Ok(Plateau {
                    start,
                    confirmed_at: curr.timestamp,
                    replicas: curr.current_replicas,
                });
            }
        }

        Err(AnalysisError::NoPlateauFound {
            threshold_secs: self.threshold_secs,
        })
    }
}

impl Default for StabilizationDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn timeline(points: &[(i64, u32)]) -> Timeline {
        Timeline::new(
            points
                .iter()
                .map(|(t, r)| Sample {
                    timestamp: at(*t),
                    current_replicas: *r,
                    desired_replicas: None,
                    current_cpu_utilization_percent: None,
                    http_requests_per_second: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_plateau_confirmed_at_threshold() {
        let tl = timeline(&[(0, 2), (10, 2), (20, 4), (80, 4), (140, 4)]);
        let plateau = StabilizationDetector::default().detect(&tl).unwrap();
        assert_eq!(plateau.start, at(20));
        assert_eq!(plateau.confirmed_at, at(80));
        assert_eq!(plateau.replicas, 4);
        assert_eq!(plateau.offset_from(at(0)), 20.0);
    }

    #[test]
    fn test_short_plateau_never_stabilizes() {
        let tl = timeline(&[(0, 3), (20, 3), (40, 3), (59, 3), (60, 4)]);
        assert_eq!(
            StabilizationDetector::default().detect(&tl),
            Err(AnalysisError::NoPlateauFound { threshold_secs: 60.0 })
        );
    }

    #[test]
    fn test_earliest_plateau_wins() {
        // 60s plateau at 2 replicas, then a much longer one at 5
        let tl = timeline(&[(0, 2), (30, 2), (60, 2), (70, 5), (200, 5), (400, 5)]);
        let plateau = StabilizationDetector::default().detect(&tl).unwrap();
        assert_eq!(plateau.start, at(0));
        assert_eq!(plateau.replicas, 2);
    }

    #[test]
    fn test_change_resets_accumulation() {
        let tl = timeline(&[(0, 2), (40, 2), (50, 3), (60, 2), (100, 2), (125, 2)]);
        let plateau = StabilizationDetector::default().detect(&tl).unwrap();
        assert_eq!(plateau.start, at(60));
        assert_eq!(plateau.confirmed_at, at(125));
    }

    #[test]
    fn test_unsorted_input_is_handled() {
        let tl = timeline(&[(60, 4), (0, 4), (30, 4)]);
        let plateau = StabilizationDetector::default().detect(&tl).unwrap();
        assert_eq!(plateau.start, at(0));
    }

    #[test]
    fn test_custom_threshold() {
        let tl = timeline(&[(0, 1), (15, 1), (30, 1)]);
        let plateau = StabilizationDetector::new(30.0).detect(&tl).unwrap();
        assert_eq!(plateau.confirmed_at, at(30));
        assert!(StabilizationDetector::new(31.0).detect(&tl).is_err());
    }

    #[test]
    fn test_single_sample_and_empty() {
        assert!(matches!(
            StabilizationDetector::default().detect(&timeline(&[(0, 1)])),
            Err(AnalysisError::NoPlateauFound { .. })
        ));
        assert_eq!(
            StabilizationDetector::default().detect(&Timeline::default()),
            Err(AnalysisError::MissingStream(StreamKind::Autoscaler))
        );
    }
}
