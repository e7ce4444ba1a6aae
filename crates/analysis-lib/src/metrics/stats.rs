//! Small numeric helpers shared by the metric computations

use chrono::{DateTime, Utc};

use crate::models::seconds_between;

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (Bessel's correction); needs at least two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Time-weighted mean of chronologically sorted points
///
/// Each value is held until the next point; the last point reuses the previous
/// span, so uniformly sampled series average to their arithmetic mean.
pub fn time_weighted_mean(points: &[(DateTime<Utc>, f64)]) -> Option<f64> {
    match points.len() {
        0 => return None,
        1 => return Some(points[0].1),
        _ => {}
    }

    let mut weights: Vec<f64> = points
        .windows(2)
        .map(|pair| seconds_between(pair[0].0, pair[1].0).max(0.0))
        .collect();
    let last_span = weights[weights.len() - 1];
    weights.push(last_span);

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
        return mean(&values);
    }

    let weighted: f64 = points
        .iter()
        .zip(&weights)
        .map(|((_, value), weight)| value * weight)
        .sum();
    Some(weighted / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(12.356, 2), 12.36);
        assert_eq!(round_to(7.0, 1), 7.0);
    }

    #[test]
    fn test_sample_std_dev() {
        assert!(sample_std_dev(&[5.0]).is_none());
        let sd = sample_std_dev(&[100.0, 200.0, 300.0]).unwrap();
        assert!((sd - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_weighting_equals_mean() {
        let points = vec![(at(0), 10.0), (at(5), 12.0), (at(10), 11.0)];
        let twm = time_weighted_mean(&points).unwrap();
        assert!((twm - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_uneven_weighting() {
        // 10 held for 30s, 20 held for 10s, last reuses 10s
        let points = vec![(at(0), 10.0), (at(30), 20.0), (at(40), 20.0)];
        let twm = time_weighted_mean(&points).unwrap();
        assert!((twm - (10.0 * 30.0 + 20.0 * 10.0 + 20.0 * 10.0) / 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_span_falls_back_to_mean() {
        let points = vec![(at(0), 10.0), (at(0), 20.0)];
        assert_eq!(time_weighted_mean(&points), Some(15.0));
        assert_eq!(time_weighted_mean(&[]), None);
    }
}
