//! Core data models for experiment telemetry and derived metrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counter exported by the benchmark server for every served request
pub const REQUESTS_TOTAL_METRIC: &str = "http_requests_total";

/// Pre-computed per-pod request rate recorded by the metrics scraper
pub const REQUESTS_RATE_METRIC: &str = "http_requests_rate";

/// One autoscaler status sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub current_replicas: u32,
    pub desired_replicas: Option<u32>,
    pub current_cpu_utilization_percent: Option<f64>,
    pub http_requests_per_second: Option<f64>,
}

/// Load pattern phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    High,
    Low,
    Other(String),
}

impl Phase {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Phase::High,
            "low" => Phase::Low,
            other => Phase::Other(other.to_string()),
        }
    }
}

/// Transition marker within a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseAction {
    Start,
    End,
}

impl PhaseAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "start" => Some(PhaseAction::Start),
            "end" => Some(PhaseAction::End),
            _ => None,
        }
    }
}

/// Externally injected load-pattern transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEvent {
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    pub action: PhaseAction,
}

impl PhaseEvent {
    /// True for the marker that opens a high-load phase
    pub fn is_high_start(&self) -> bool {
        self.phase == Phase::High && self.action == PhaseAction::Start
    }
}

/// Raw per-pod CPU reading as reported by the metrics API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodCpuSample {
    pub timestamp: DateTime<Utc>,
    pub pod_id: String,
    pub raw_cpu: String,
}

/// A single point of a throughput series; `None` when the recorded value was not numeric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// One row scraped from the pods' metrics endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedMetric {
    pub timestamp: DateTime<Utc>,
    pub pod: Option<String>,
    pub metric: String,
    pub value: Option<f64>,
}

/// Telemetry streams recorded for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Autoscaler,
    Phases,
    PodCpu,
    DedicatedRate,
    ScrapedMetrics,
}

impl StreamKind {
    pub const ALL: [StreamKind; 5] = [
        StreamKind::Autoscaler,
        StreamKind::Phases,
        StreamKind::PodCpu,
        StreamKind::DedicatedRate,
        StreamKind::ScrapedMetrics,
    ];

    /// File name of the stream inside a run directory
    pub fn file_name(&self) -> &'static str {
        match self {
            StreamKind::Autoscaler => "hpa_log.csv",
            StreamKind::Phases => "phases.log",
            StreamKind::PodCpu => "pod_cpu.csv",
            StreamKind::DedicatedRate => "http_rps.csv",
            StreamKind::ScrapedMetrics => "prometheus_metrics.csv",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Everything recorded for one experiment run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunTelemetry {
    pub label: String,
    pub autoscaler: Vec<Sample>,
    pub phases: Vec<PhaseEvent>,
    pub pod_cpu: Vec<PodCpuSample>,
    pub dedicated_rate: Vec<RatePoint>,
    pub scraped: Vec<ScrapedMetric>,
}

impl RunTelemetry {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Whether the given stream has at least one record
    pub fn has_stream(&self, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Autoscaler => !self.autoscaler.is_empty(),
            StreamKind::Phases => !self.phases.is_empty(),
            StreamKind::PodCpu => !self.pod_cpu.is_empty(),
            StreamKind::DedicatedRate => !self.dedicated_rate.is_empty(),
            StreamKind::ScrapedMetrics => !self.scraped.is_empty(),
        }
    }

    /// Whether the run has autoscaler samples; a metric record also needs phase markers
    pub fn is_usable(&self) -> bool {
        self.has_stream(StreamKind::Autoscaler)
    }

    /// Earliest `high`/`start` phase marker, the anchor of time-to-X metrics
    pub fn first_high_start(&self) -> Option<DateTime<Utc>> {
        self.phases
            .iter()
            .filter(|event| event.is_high_start())
            .map(|event| event.timestamp)
            .min()
    }
}

/// Autoscaler samples in chronological order
///
/// Construction sorts the samples (stably), so every detector can rely on order
/// without trusting the recorder.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    samples: Vec<Sample>,
}

impl Timeline {
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|sample| sample.timestamp);
        Self { samples }
    }

    pub fn from_slice(samples: &[Sample]) -> Self {
        Self::new(samples.to_vec())
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Samples paired with their utilization, skipping non-numeric readings
    pub fn utilization_points(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.samples
            .iter()
            .filter_map(|s| {
                s.current_cpu_utilization_percent
                    .filter(|v| v.is_finite())
                    .map(|v| (s.timestamp, v))
            })
            .collect()
    }
}

/// Seconds elapsed from `from` to `to` (negative if `to` is earlier)
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Names of the derived metrics, in table column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    TimeToScaleUpS,
    TimeToStabilizeS,
    MaxReplicas,
    AvgCpuUtil,
    AvgHttpRps,
    PeakHttpRps,
    OvershootUndershootArea,
    PodSeconds,
    PodCpuStdDev,
}

impl MetricName {
    pub const ALL: [MetricName; 9] = [
        MetricName::TimeToScaleUpS,
        MetricName::TimeToStabilizeS,
        MetricName::MaxReplicas,
        MetricName::AvgCpuUtil,
        MetricName::AvgHttpRps,
        MetricName::PeakHttpRps,
        MetricName::OvershootUndershootArea,
        MetricName::PodSeconds,
        MetricName::PodCpuStdDev,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::TimeToScaleUpS => "time_to_scale_up_s",
            MetricName::TimeToStabilizeS => "time_to_stabilize_s",
            MetricName::MaxReplicas => "max_replicas",
            MetricName::AvgCpuUtil => "avg_cpu_util",
            MetricName::AvgHttpRps => "avg_http_rps",
            MetricName::PeakHttpRps => "peak_http_rps",
            MetricName::OvershootUndershootArea => "overshoot_undershoot_area",
            MetricName::PodSeconds => "pod_seconds",
            MetricName::PodCpuStdDev => "pod_cpu_std_dev",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single derived scalar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(u64),
    Decimal(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(v) => write!(f, "{}", v),
            MetricValue::Decimal(v) if v.fract() == 0.0 => write!(f, "{:.1}", v),
            MetricValue::Decimal(v) => write!(f, "{}", v),
        }
    }
}

/// Derived metrics for one run; `None` means undefined for the run, never zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_scale_up_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_stabilize_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_cpu_util: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_http_rps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_http_rps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overshoot_undershoot_area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_cpu_std_dev: Option<f64>,
}

impl DerivedMetrics {
    pub fn get(&self, name: MetricName) -> Option<MetricValue> {
        match name {
            MetricName::TimeToScaleUpS => self.time_to_scale_up_s.map(MetricValue::Decimal),
            MetricName::TimeToStabilizeS => self.time_to_stabilize_s.map(MetricValue::Decimal),
            MetricName::MaxReplicas => self.max_replicas.map(|v| MetricValue::Integer(v as u64)),
            MetricName::AvgCpuUtil => self.avg_cpu_util.map(MetricValue::Decimal),
            MetricName::AvgHttpRps => self.avg_http_rps.map(MetricValue::Decimal),
            MetricName::PeakHttpRps => self.peak_http_rps.map(MetricValue::Decimal),
            MetricName::OvershootUndershootArea => {
                self.overshoot_undershoot_area.map(MetricValue::Decimal)
            }
            MetricName::PodSeconds => self.pod_seconds.map(MetricValue::Integer),
            MetricName::PodCpuStdDev => self.pod_cpu_std_dev.map(MetricValue::Decimal),
        }
    }

    /// Names of the metrics defined for this run
    pub fn present(&self) -> Vec<MetricName> {
        MetricName::ALL
            .into_iter()
            .filter(|name| self.get(*name).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample(secs: i64, replicas: u32) -> Sample {
        Sample {
            timestamp: at(secs),
            current_replicas: replicas,
            desired_replicas: None,
            current_cpu_utilization_percent: None,
            http_requests_per_second: None,
        }
    }

    #[test]
    fn test_timeline_sorts_samples() {
        let timeline = Timeline::new(vec![sample(20, 3), sample(0, 1), sample(10, 2)]);
        let replicas: Vec<u32> = timeline.samples().iter().map(|s| s.current_replicas).collect();
        assert_eq!(replicas, vec![1, 2, 3]);
    }

    #[test]
    fn test_first_high_start_is_earliest() {
        let mut run = RunTelemetry::new("r");
        run.phases = vec![
            PhaseEvent { timestamp: at(300), phase: Phase::High, action: PhaseAction::Start },
            PhaseEvent { timestamp: at(100), phase: Phase::High, action: PhaseAction::Start },
            PhaseEvent { timestamp: at(50), phase: Phase::Low, action: PhaseAction::Start },
        ];
        assert_eq!(run.first_high_start(), Some(at(100)));
    }

    #[test]
    fn test_phase_parsing() {
        assert_eq!(Phase::parse(" HIGH "), Phase::High);
        assert_eq!(Phase::parse("ramp"), Phase::Other("ramp".to_string()));
        assert_eq!(PhaseAction::parse("end"), Some(PhaseAction::End));
        assert_eq!(PhaseAction::parse("pause"), None);
    }

    #[test]
    fn test_metric_value_display() {
        assert_eq!(MetricValue::Decimal(20.0).to_string(), "20.0");
        assert_eq!(MetricValue::Decimal(12.25).to_string(), "12.25");
        assert_eq!(MetricValue::Integer(700).to_string(), "700");
    }

    #[test]
    fn test_derived_metrics_present() {
        let metrics = DerivedMetrics {
            max_replicas: Some(4),
            pod_seconds: Some(80),
            ..Default::default()
        };
        assert_eq!(metrics.present(), vec![MetricName::MaxReplicas, MetricName::PodSeconds]);
        assert!(DerivedMetrics::default().is_empty());
    }
}
