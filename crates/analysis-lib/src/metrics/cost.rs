//! Replica-time cost proxy

use crate::models::Timeline;

/// Replica count summed over samples, times the nominal sampling interval
///
/// Intentionally not weighted by the actual gap between samples: runs recorded at
/// different densities stay comparable as long as they share the nominal interval.
pub fn pod_seconds(timeline: &Timeline, sample_interval_secs: u64) -> Option<u64> {
    if timeline.is_empty() {
        return None;
    }
    let replica_samples: u64 = timeline
        .samples()
        .iter()
        .map(|sample| sample.current_replicas as u64)
        .sum();
    Some(replica_samples * sample_interval_secs)
}

pub fn max_replicas(timeline: &Timeline) -> Option<u32> {
    timeline.samples().iter().map(|s| s.current_replicas).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use chrono::{TimeZone, Utc};

    fn timeline(replicas: &[u32]) -> Timeline {
        Timeline::new(
            replicas
                .iter()
                .enumerate()
                .map(|(i, r)| Sample {
                    // deliberately uneven spacing
                    timestamp: Utc.timestamp_opt(1_700_000_000 + (i * i) as i64, 0).unwrap(),
                    current_replicas: *r,
                    desired_replicas: None,
                    current_cpu_utilization_percent: None,
                    http_requests_per_second: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_pod_seconds_ignores_spacing() {
        let tl = timeline(&[2, 2, 4, 4, 4]);
        assert_eq!(pod_seconds(&tl, 5), Some(80));
    }

    #[test]
    fn test_pod_seconds_linear_in_interval() {
        let tl = timeline(&[1, 3, 5, 2]);
        let base = pod_seconds(&tl, 5).unwrap();
        assert_eq!(pod_seconds(&tl, 10), Some(base * 2));
    }

    #[test]
    fn test_empty_timeline() {
        assert_eq!(pod_seconds(&Timeline::default(), 5), None);
        assert_eq!(max_replicas(&Timeline::default()), None);
    }

    #[test]
    fn test_max_replicas() {
        assert_eq!(max_replicas(&timeline(&[2, 7, 3])), Some(7));
    }
}
