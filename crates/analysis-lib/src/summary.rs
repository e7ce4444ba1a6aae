//! Per-run summaries and the cross-run comparison table

use anyhow::{Context, Result as AnyResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::metrics::{
    detect_scale_up, max_replicas, pod_cpu_dispersion, pod_seconds, stats::round_to,
    StabilizationDetector, ThroughputReconciler, ThroughputSource, UtilizationIntegrator,
};
use crate::models::{DerivedMetrics, MetricName, RunTelemetry, StreamKind, Timeline};
use crate::observability::StructuredLogger;

/// Derived metrics of one run plus the context needed to interpret them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub metrics: DerivedMetrics,
    /// Throughput source that produced `avg_http_rps`
    pub throughput_source: Option<ThroughputSource>,
    /// Onset of the first replica plateau
    pub stabilized_at: Option<DateTime<Utc>>,
    /// CPU readings excluded from `pod_cpu_std_dev`
    pub malformed_cpu_samples: usize,
}

impl RunSummary {
    fn empty(label: &str) -> Self {
        Self {
            label: label.to_string(),
            metrics: DerivedMetrics::default(),
            throughput_source: None,
            stabilized_at: None,
            malformed_cpu_samples: 0,
        }
    }
}

/// Computes derived metrics run by run
pub struct RunSummarizer {
    config: AnalysisConfig,
    logger: StructuredLogger,
}

impl RunSummarizer {
    pub fn new(config: AnalysisConfig, logger: StructuredLogger) -> Self {
        Self { config, logger }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Compose every metric that can be defined for `run`
    ///
    /// A run without autoscaler samples or without phase markers yields an empty
    /// record; every other shortfall only omits the affected metric.
    pub fn summarize(&self, run: &RunTelemetry) -> RunSummary {
        let label = run.label.as_str();
        let mut summary = RunSummary::empty(label);

        for required in [StreamKind::Autoscaler, StreamKind::Phases] {
            if !run.has_stream(required) {
                let reason = AnalysisError::MissingStream(required);
                for metric in MetricName::ALL {
                    self.logger.log_metric_omitted(label, metric, &reason);
                }
                self.logger.log_run_summarized(label, &summary.metrics, None);
                return summary;
            }
        }

        let timeline = Timeline::from_slice(&run.autoscaler);
        let anchor = run.first_high_start();
        let metrics = &mut summary.metrics;

        match detect_scale_up(&timeline, anchor) {
            Ok(Some(event)) => metrics.time_to_scale_up_s = Some(event.delay_secs()),
            Ok(None) => tracing::debug!(run = %label, "Autoscaler never scaled above initial replicas"),
            Err(reason) => self
                .logger
                .log_metric_omitted(label, MetricName::TimeToScaleUpS, &reason),
        }

        let plateau = match StabilizationDetector::new(self.config.plateau_threshold_secs)
            .detect(&timeline)
        {
            Ok(plateau) => Some(plateau),
            Err(reason) => {
                self.logger
                    .log_metric_omitted(label, MetricName::TimeToStabilizeS, &reason);
                None
            }
        };

        if let Some(plateau) = &plateau {
            let stabilize_anchor = anchor.or_else(|| {
                self.config
                    .anchor_fallback_to_run_start
                    .then(|| timeline.first().map(|s| s.timestamp))
                    .flatten()
            });
            match stabilize_anchor {
                Some(anchor) => metrics.time_to_stabilize_s = Some(plateau.offset_from(anchor)),
                None => self.logger.log_metric_omitted(
                    label,
                    MetricName::TimeToStabilizeS,
                    &AnalysisError::UndefinedAnchor,
                ),
            }
        }
        summary.stabilized_at = plateau.as_ref().map(|p| p.start);

        metrics.max_replicas = max_replicas(&timeline);

        let integrator = UtilizationIntegrator::new(self.config.target_utilization_percent);
        metrics.avg_cpu_util = integrator
            .average(&timeline, summary.stabilized_at)
            .map(|v| round_to(v, 1));
        metrics.overshoot_undershoot_area = integrator
            .tracking_error_area(&timeline)
            .map(|v| round_to(v, 1));

        if let Some(throughput) = ThroughputReconciler::new(&self.config.throughput_order).reconcile(run) {
            metrics.avg_http_rps = Some(throughput.avg_rps);
            metrics.peak_http_rps = throughput.peak_rps;
            summary.throughput_source = Some(throughput.source);
        }

        metrics.pod_seconds = pod_seconds(&timeline, self.config.sample_interval_secs);

        if run.has_stream(StreamKind::PodCpu) {
            let dispersion = pod_cpu_dispersion(&run.pod_cpu);
            if dispersion.malformed > 0 {
                self.logger
                    .log_malformed_quantities(label, dispersion.malformed, dispersion.parsed);
            }
            metrics.pod_cpu_std_dev = dispersion.std_dev_millis;
            summary.malformed_cpu_samples = dispersion.malformed;
        } else {
            self.logger.log_metric_omitted(
                label,
                MetricName::PodCpuStdDev,
                &AnalysisError::MissingStream(StreamKind::PodCpu),
            );
        }

        self.logger
            .log_run_summarized(label, &summary.metrics, summary.throughput_source);
        summary
    }

    /// Summarize a batch of runs into a comparison table
    ///
    /// Fails when no run yields a single metric, so an all-empty table is never produced.
    pub fn summarize_all(&self, runs: &[RunTelemetry]) -> Result<SummaryTable> {
        let rows: Vec<RunSummary> = runs.iter().map(|run| self.summarize(run)).collect();
        let usable = rows.iter().filter(|row| !row.metrics.is_empty()).count();
        self.logger.log_batch_completed(rows.len(), usable);
        if usable == 0 {
            return Err(AnalysisError::NoUsableTelemetry);
        }

        Ok(SummaryTable::new(rows))
    }
}

/// Summarize a single run with a default logger
pub fn summarize_run(run: &RunTelemetry, config: &AnalysisConfig) -> RunSummary {
    RunSummarizer::new(config.clone(), StructuredLogger::default()).summarize(run)
}

/// Cross-run comparison table, one row per run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    index_name: String,
    rows: Vec<RunSummary>,
}

impl SummaryTable {
    pub fn new(rows: Vec<RunSummary>) -> Self {
        Self {
            index_name: "run".to_string(),
            rows,
        }
    }

    /// Name of the key column in serialized output
    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    pub fn rows(&self) -> &[RunSummary] {
        &self.rows
    }

    pub fn row(&self, label: &str) -> Option<&RunSummary> {
        self.rows.iter().find(|row| row.label == label)
    }

    /// Union of metric names defined for any run, in canonical order
    pub fn columns(&self) -> Vec<MetricName> {
        MetricName::ALL
            .into_iter()
            .filter(|name| self.rows.iter().any(|row| row.metrics.get(*name).is_some()))
            .collect()
    }

    /// Delimited text rendering; undefined cells are left empty
    pub fn to_csv(&self) -> String {
        let columns = self.columns();
        let mut out = String::new();

        out.push_str(&escape_field(&self.index_name));
        for column in &columns {
            out.push(',');
            out.push_str(column.as_str());
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&escape_field(&row.label));
            for column in &columns {
                out.push(',');
                if let Some(value) = row.metrics.get(*column) {
                    out.push_str(&value.to_string());
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> AnyResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_csv())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
