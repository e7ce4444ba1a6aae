//! Throughput source reconciliation
//!
//! A run may carry request-rate telemetry from several collectors of differing
//! fidelity. Sources are tried strictly in rank order and the first one with any
//! numeric value is used in full; sources are never blended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::{
    seconds_between, RatePoint, RunTelemetry, REQUESTS_RATE_METRIC, REQUESTS_TOTAL_METRIC,
};

use super::stats::{round_to, time_weighted_mean};

/// Where a throughput series came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThroughputSource {
    /// Dedicated cluster-wide rate collector (`http_rps.csv`)
    DedicatedRate,
    /// Custom metric reported by the autoscaler itself
    HpaCustomMetric,
    /// Rates derived from scraped per-pod request counters
    DerivedCounterRate,
}

impl ThroughputSource {
    pub const DEFAULT_ORDER: [ThroughputSource; 3] = [
        ThroughputSource::DedicatedRate,
        ThroughputSource::HpaCustomMetric,
        ThroughputSource::DerivedCounterRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThroughputSource::DedicatedRate => "dedicated_rate",
            ThroughputSource::HpaCustomMetric => "hpa_custom_metric",
            ThroughputSource::DerivedCounterRate => "derived_counter_rate",
        }
    }

    /// Only the dedicated collector samples finely enough for a meaningful peak
    pub fn reports_peak(&self) -> bool {
        matches!(self, ThroughputSource::DedicatedRate)
    }

    fn extractor(&self) -> Extractor {
        match self {
            ThroughputSource::DedicatedRate => dedicated_rate,
            ThroughputSource::HpaCustomMetric => hpa_custom_metric,
            ThroughputSource::DerivedCounterRate => derived_counter_rate,
        }
    }
}

impl fmt::Display for ThroughputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThroughputSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "dedicated_rate" | "dedicated" => Ok(ThroughputSource::DedicatedRate),
            "hpa_custom_metric" | "hpa" => Ok(ThroughputSource::HpaCustomMetric),
            "derived_counter_rate" | "counter" => Ok(ThroughputSource::DerivedCounterRate),
            other => Err(format!("unknown throughput source: {}", other)),
        }
    }
}

type Extractor = fn(&RunTelemetry) -> Vec<RatePoint>;

/// A ranked throughput series
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputCandidate {
    pub source: ThroughputSource,
    pub series: Vec<RatePoint>,
}

impl ThroughputCandidate {
    /// Numeric points in chronological order
    pub fn numeric_points(&self) -> Vec<(DateTime<Utc>, f64)> {
        let mut points: Vec<(DateTime<Utc>, f64)> = self
            .series
            .iter()
            .filter_map(|p| p.value.filter(|v| v.is_finite()).map(|v| (p.timestamp, v)))
            .collect();
        points.sort_by_key(|(ts, _)| *ts);
        points
    }
}

/// Summary of the selected throughput series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputSummary {
    pub source: ThroughputSource,
    /// Mean request rate, rounded to two decimals
    pub avg_rps: f64,
    /// Maximum request rate; only for sources that support a peak estimate
    pub peak_rps: Option<f64>,
    pub points: usize,
}

/// Pick the first candidate, in the given order, that has any numeric value
pub fn select_candidate(
    candidates: &[ThroughputCandidate],
) -> Option<(ThroughputSource, Vec<(DateTime<Utc>, f64)>)> {
    candidates.iter().find_map(|candidate| {
        let points = candidate.numeric_points();
        (!points.is_empty()).then_some((candidate.source, points))
    })
}

/// Ordered `(source, extractor)` precedence list
pub struct ThroughputReconciler {
    order: Vec<(ThroughputSource, Extractor)>,
}

impl ThroughputReconciler {
    pub fn new(order: &[ThroughputSource]) -> Self {
        Self {
            order: order.iter().map(|source| (*source, source.extractor())).collect(),
        }
    }

    /// The selected source and its numeric points, without reduction
    ///
    /// Extraction stops at the first source with data, so lower-ranked sources are
    /// never consulted once a higher-ranked one qualifies.
    pub fn select(&self, run: &RunTelemetry) -> Option<(ThroughputSource, Vec<(DateTime<Utc>, f64)>)> {
        self.order.iter().find_map(|(source, extract)| {
            let candidate = ThroughputCandidate {
                source: *source,
                series: extract(run),
            };
            select_candidate(std::slice::from_ref(&candidate))
        })
    }

    pub fn reconcile(&self, run: &RunTelemetry) -> Option<ThroughputSummary> {
        let (source, points) = self.select(run)?;
        let avg = time_weighted_mean(&points)?;
        let peak = source.reports_peak().then(|| {
            points
                .iter()
                .map(|(_, v)| *v)
                .fold(f64::NEG_INFINITY, f64::max)
        });

        Some(ThroughputSummary {
            source,
            avg_rps: round_to(avg, 2),
            peak_rps: peak.map(|p| round_to(p, 2)),
            points: points.len(),
        })
    }
}

impl Default for ThroughputReconciler {
    fn default() -> Self {
        Self::new(&ThroughputSource::DEFAULT_ORDER)
    }
}

fn dedicated_rate(run: &RunTelemetry) -> Vec<RatePoint> {
    run.dedicated_rate.clone()
}

fn hpa_custom_metric(run: &RunTelemetry) -> Vec<RatePoint> {
    run.autoscaler
        .iter()
        .map(|sample| RatePoint {
            timestamp: sample.timestamp,
            value: sample.http_requests_per_second,
        })
        .collect()
}

/// Cluster-wide rate from scraped pod metrics
///
/// Pre-computed per-pod rates are summed per scrape timestamp. Without them, per-pod
/// request counters are differenced into rates first; counter resets are skipped.
fn derived_counter_rate(run: &RunTelemetry) -> Vec<RatePoint> {
    let rates: Vec<_> = run
        .scraped
        .iter()
        .filter(|row| row.metric == REQUESTS_RATE_METRIC)
        .map(|row| (row.timestamp, row.value))
        .collect();
    if !rates.is_empty() {
        return sum_per_timestamp(rates);
    }

    let mut counters: BTreeMap<&str, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();
    for row in run.scraped.iter().filter(|row| row.metric == REQUESTS_TOTAL_METRIC) {
        if let Some(value) = row.value.filter(|v| v.is_finite()) {
            counters
                .entry(row.pod.as_deref().unwrap_or(""))
                .or_default()
                .push((row.timestamp, value));
        }
    }

    let mut derived = Vec::new();
    for series in counters.values_mut() {
        series.sort_by_key(|(ts, _)| *ts);
        for pair in series.windows(2) {
            let (prev_ts, prev) = pair[0];
            let (ts, curr) = pair[1];
            let dt = seconds_between(prev_ts, ts);
            if dt > 0.0 && curr >= prev {
                derived.push((ts, Some((curr - prev) / dt)));
            }
        }
    }
    sum_per_timestamp(derived)
}

fn sum_per_timestamp(values: Vec<(DateTime<Utc>, Option<f64>)>) -> Vec<RatePoint> {
    let mut totals: BTreeMap<DateTime<Utc>, Option<f64>> = BTreeMap::new();
    for (ts, value) in values {
        let slot = totals.entry(ts).or_insert(None);
        if let Some(v) = value.filter(|v| v.is_finite()) {
            *slot = Some(slot.unwrap_or(0.0) + v);
        }
    }
    totals
        .into_iter()
        .map(|(timestamp, value)| RatePoint { timestamp, value })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sample, ScrapedMetric};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn rate_points(values: &[Option<f64>]) -> Vec<RatePoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| RatePoint { timestamp: at(i as i64 * 5), value: *value })
            .collect()
    }

    fn run_with_hpa_rps(values: &[Option<f64>]) -> RunTelemetry {
        let mut run = RunTelemetry::new("test");
        run.autoscaler = values
            .iter()
            .enumerate()
            .map(|(i, rps)| Sample {
                timestamp: at(i as i64 * 5),
                current_replicas: 1,
                desired_replicas: None,
                current_cpu_utilization_percent: None,
                http_requests_per_second: *rps,
            })
            .collect();
        run
    }

    fn scraped(secs: i64, pod: &str, metric: &str, value: f64) -> ScrapedMetric {
        ScrapedMetric {
            timestamp: at(secs),
            pod: Some(pod.to_string()),
            metric: metric.to_string(),
            value: Some(value),
        }
    }

    #[test]
    fn test_dedicated_rate_wins_over_hpa() {
        let mut run = run_with_hpa_rps(&[Some(9.0), Some(9.0), Some(9.0)]);
        run.dedicated_rate = rate_points(&[Some(10.0), Some(12.0), Some(11.0)]);

        let summary = ThroughputReconciler::default().reconcile(&run).unwrap();
        assert_eq!(summary.source, ThroughputSource::DedicatedRate);
        assert_eq!(summary.avg_rps, 11.0);
        assert_eq!(summary.peak_rps, Some(12.0));
    }

    #[test]
    fn test_short_higher_ranked_series_still_wins() {
        let mut run = run_with_hpa_rps(&[Some(9.0); 50]);
        run.dedicated_rate = rate_points(&[None, Some(4.0), None]);

        let summary = ThroughputReconciler::default().reconcile(&run).unwrap();
        assert_eq!(summary.source, ThroughputSource::DedicatedRate);
        assert_eq!(summary.avg_rps, 4.0);
        assert_eq!(summary.points, 1);
    }

    #[test]
    fn test_falls_back_when_dedicated_has_no_numbers() {
        let mut run = run_with_hpa_rps(&[Some(8.0), None, Some(10.0)]);
        run.dedicated_rate = rate_points(&[None, None]);

        let summary = ThroughputReconciler::default().reconcile(&run).unwrap();
        assert_eq!(summary.source, ThroughputSource::HpaCustomMetric);
        assert_eq!(summary.avg_rps, 9.0);
        assert_eq!(summary.peak_rps, None);
    }

    #[test]
    fn test_custom_order_is_respected() {
        let mut run = run_with_hpa_rps(&[Some(9.0), Some(9.0)]);
        run.dedicated_rate = rate_points(&[Some(10.0), Some(12.0)]);

        let reconciler = ThroughputReconciler::new(&[
            ThroughputSource::HpaCustomMetric,
            ThroughputSource::DedicatedRate,
        ]);
        let summary = reconciler.reconcile(&run).unwrap();
        assert_eq!(summary.source, ThroughputSource::HpaCustomMetric);
        assert_eq!(summary.peak_rps, None);
    }

    #[test]
    fn test_scraped_rates_summed_per_timestamp() {
        let mut run = RunTelemetry::new("test");
        run.scraped = vec![
            scraped(0, "a", REQUESTS_RATE_METRIC, 3.0),
            scraped(0, "b", REQUESTS_RATE_METRIC, 5.0),
            scraped(10, "a", REQUESTS_RATE_METRIC, 6.0),
            scraped(10, "b", REQUESTS_RATE_METRIC, 6.0),
        ];

        let summary = ThroughputReconciler::default().reconcile(&run).unwrap();
        assert_eq!(summary.source, ThroughputSource::DerivedCounterRate);
        assert_eq!(summary.avg_rps, 10.0);
        assert_eq!(summary.peak_rps, None);
    }

    #[test]
    fn test_counters_differenced_into_rates() {
        let mut run = RunTelemetry::new("test");
        run.scraped = vec![
            scraped(0, "a", REQUESTS_TOTAL_METRIC, 100.0),
            scraped(10, "a", REQUESTS_TOTAL_METRIC, 200.0),
            scraped(20, "a", REQUESTS_TOTAL_METRIC, 5.0), // restarted pod
            scraped(0, "b", REQUESTS_TOTAL_METRIC, 0.0),
            scraped(10, "b", REQUESTS_TOTAL_METRIC, 50.0),
        ];

        let reconciler = ThroughputReconciler::default();
        let (source, points) = reconciler.select(&run).unwrap();
        assert_eq!(source, ThroughputSource::DerivedCounterRate);
        assert_eq!(points, vec![(at(10), 15.0)]);
    }

    #[test]
    fn test_no_source_yields_none() {
        let run = run_with_hpa_rps(&[None, None]);
        assert!(ThroughputReconciler::default().reconcile(&run).is_none());
    }

    #[test]
    fn test_select_candidate_rank_order() {
        let candidates = vec![
            ThroughputCandidate {
                source: ThroughputSource::HpaCustomMetric,
                series: rate_points(&[None]),
            },
            ThroughputCandidate {
                source: ThroughputSource::DerivedCounterRate,
                series: rate_points(&[Some(1.0), Some(2.0)]),
            },
        ];
        let (source, points) = select_candidate(&candidates).unwrap();
        assert_eq!(source, ThroughputSource::DerivedCounterRate);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!("dedicated-rate".parse::<ThroughputSource>(), Ok(ThroughputSource::DedicatedRate));
        assert_eq!("hpa".parse::<ThroughputSource>(), Ok(ThroughputSource::HpaCustomMetric));
        assert!("carrier-pigeon".parse::<ThroughputSource>().is_err());
    }
}
