//! Observability infrastructure for the analysis pass
//!
//! Provides structured logging with tracing for run loading, metric omission and
//! batch completion. Every event carries an `event` field plus the experiment name,
//! so JSON logs of several batches can be filtered together.

use tracing::{debug, info, warn};

use crate::error::AnalysisError;
use crate::metrics::ThroughputSource;
use crate::models::{DerivedMetrics, MetricName, StreamKind};

/// Structured logger for analysis events
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    experiment: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("default")
    }
}

impl StructuredLogger {
    pub fn new(experiment: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
        }
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Log a run directory that was read into memory
    pub fn log_run_loaded(
        &self,
        run: &str,
        autoscaler_samples: usize,
        phase_events: usize,
        pod_cpu_samples: usize,
        dedicated_rate_points: usize,
        scraped_rows: usize,
    ) {
        info!(
            event = "run_loaded",
            experiment = %self.experiment,
            run = %run,
            autoscaler_samples = autoscaler_samples,
            phase_events = phase_events,
            pod_cpu_samples = pod_cpu_samples,
            dedicated_rate_points = dedicated_rate_points,
            scraped_rows = scraped_rows,
            "Loaded run telemetry"
        );
    }

    /// Log a stream file that does not exist in the run directory
    ///
    /// Optional streams (dedicated rate, scraped metrics) are only worth a debug line.
    pub fn log_stream_missing(&self, run: &str, stream: StreamKind) {
        match stream {
            StreamKind::DedicatedRate | StreamKind::ScrapedMetrics => {
                debug!(
                    event = "stream_missing",
                    experiment = %self.experiment,
                    run = %run,
                    stream = %stream,
                    "Optional telemetry stream not recorded"
                );
            }
            _ => {
                warn!(
                    event = "stream_missing",
                    experiment = %self.experiment,
                    run = %run,
                    stream = %stream,
                    "Telemetry stream missing"
                );
            }
        }
    }

    /// Log a stream file that exists but could not be read or parsed
    pub fn log_stream_unreadable(&self, run: &str, stream: StreamKind, error: &anyhow::Error) {
        let error = format!("{:#}", error);
        warn!(
            event = "stream_unreadable",
            experiment = %self.experiment,
            run = %run,
            stream = %stream,
            error = %error,
            "Ignoring unreadable telemetry stream"
        );
    }

    /// Log rows dropped during ingestion (bad timestamp, non-numeric replica count, ...)
    pub fn log_rows_skipped(&self, run: &str, stream: StreamKind, skipped: usize) {
        warn!(
            event = "rows_skipped",
            experiment = %self.experiment,
            run = %run,
            stream = %stream,
            skipped = skipped,
            "Skipped malformed telemetry rows"
        );
    }

    /// Log CPU readings excluded from the dispersion statistic
    pub fn log_malformed_quantities(&self, run: &str, malformed: usize, parsed: usize) {
        warn!(
            event = "malformed_quantities",
            experiment = %self.experiment,
            run = %run,
            malformed = malformed,
            parsed = parsed,
            "Excluded malformed CPU quantities from dispersion"
        );
    }

    /// Log a metric left undefined for a run
    pub fn log_metric_omitted(&self, run: &str, metric: MetricName, reason: &AnalysisError) {
        debug!(
            event = "metric_omitted",
            experiment = %self.experiment,
            run = %run,
            metric = %metric,
            reason = %reason,
            "Metric undefined for run"
        );
    }

    /// Log a finished run summary
    pub fn log_run_summarized(
        &self,
        run: &str,
        metrics: &DerivedMetrics,
        throughput_source: Option<ThroughputSource>,
    ) {
        info!(
            event = "run_summarized",
            experiment = %self.experiment,
            run = %run,
            metrics_defined = metrics.present().len(),
            time_to_scale_up_s = ?metrics.time_to_scale_up_s,
            time_to_stabilize_s = ?metrics.time_to_stabilize_s,
            max_replicas = ?metrics.max_replicas,
            throughput_source = ?throughput_source.map(|s| s.as_str()),
            "Computed derived metrics"
        );
    }

    /// Log the end of a batch
    pub fn log_batch_completed(&self, runs: usize, usable_runs: usize) {
        if usable_runs == runs {
            info!(
                event = "batch_completed",
                experiment = %self.experiment,
                runs = runs,
                usable_runs = usable_runs,
                "Analysis batch completed"
            );
        } else {
            warn!(
                event = "batch_completed",
                experiment = %self.experiment,
                runs = runs,
                usable_runs = usable_runs,
                "Analysis batch completed with unusable runs"
            );
        }
    }
}
