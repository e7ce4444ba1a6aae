//! Telemetry ingestion from experiment result directories
//!
//! Each run directory holds one CSV file per telemetry stream (see
//! [`StreamKind::file_name`]). A missing or unreadable stream degrades the run to
//! fewer metrics; only an unreadable run directory is an error.

mod table;

pub use table::{parse_timestamp, CsvTable, Row};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{
    Phase, PhaseAction, PhaseEvent, PodCpuSample, RatePoint, RunTelemetry, Sample,
    ScrapedMetric, StreamKind,
};
use crate::observability::StructuredLogger;

/// Directory name reserved for analysis output
pub const OUTPUT_DIR_NAME: &str = "plots";

/// Maximum nesting of run directories below the results root
const MAX_DISCOVERY_DEPTH: usize = 2;

/// A run directory and the label it is reported under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSource {
    pub label: String,
    pub path: PathBuf,
}

impl RunSource {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Streams whose file exists in the run directory
    pub fn available_streams(&self) -> Vec<StreamKind> {
        StreamKind::ALL
            .into_iter()
            .filter(|kind| self.path.join(kind.file_name()).is_file())
            .collect()
    }
}

/// Find run directories below `root`
///
/// Any directory (up to two levels deep, skipping the output directory) that holds an
/// autoscaler log is a run. Labels are the relative path joined with `-`, so
/// `pcm-cpu/60s` is reported as `pcm-cpu-60s`. Results are sorted by label.
pub fn discover_runs(root: &Path) -> Result<Vec<RunSource>> {
    if !root.is_dir() {
        bail!("results directory {} does not exist", root.display());
    }

    let mut runs = Vec::new();
    visit(root, root, 0, &mut runs)?;
    runs.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(runs)
}

fn visit(root: &Path, dir: &Path, depth: usize, runs: &mut Vec<RunSource>) -> Result<()> {
    if depth > 0 && dir.join(StreamKind::Autoscaler.file_name()).is_file() {
        let relative = dir.strip_prefix(root).unwrap_or(dir);
        let label = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("-");
        runs.push(RunSource::new(label, dir));
        return Ok(());
    }
    if depth == MAX_DISCOVERY_DEPTH {
        return Ok(());
    }

    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let path = entry.path();
        if !path.is_dir() || entry.file_name() == OUTPUT_DIR_NAME {
            continue;
        }
        visit(root, &path, depth + 1, runs)?;
    }
    Ok(())
}

/// Read every stream of a run directory
pub fn load_run(source: &RunSource, logger: &StructuredLogger) -> Result<RunTelemetry> {
    if !source.path.is_dir() {
        bail!(
            "run directory {} for {} does not exist",
            source.path.display(),
            source.label
        );
    }

    let mut run = RunTelemetry::new(&source.label);

    for kind in StreamKind::ALL {
        let path = source.path.join(kind.file_name());
        if !path.is_file() {
            logger.log_stream_missing(&source.label, kind);
            continue;
        }

        let table = match read_table(&path) {
            Ok(table) => table,
            Err(err) => {
                logger.log_stream_unreadable(&source.label, kind, &err);
                continue;
            }
        };

        let unparsed = match kind {
            StreamKind::Autoscaler => collect(&table, parse_autoscaler, &mut run.autoscaler),
            StreamKind::Phases => collect(&table, parse_phases, &mut run.phases),
            StreamKind::PodCpu => collect(&table, parse_pod_cpu, &mut run.pod_cpu),
            StreamKind::DedicatedRate => {
                collect(&table, parse_dedicated_rate, &mut run.dedicated_rate)
            }
            StreamKind::ScrapedMetrics => collect(&table, parse_scraped, &mut run.scraped),
        };
        let skipped = table.malformed_rows() + unparsed;
        if skipped > 0 {
            logger.log_rows_skipped(&source.label, kind, skipped);
        }
    }

    logger.log_run_loaded(
        &run.label,
        run.autoscaler.len(),
        run.phases.len(),
        run.pod_cpu.len(),
        run.dedicated_rate.len(),
        run.scraped.len(),
    );
    Ok(run)
}

fn read_table(path: &Path) -> Result<CsvTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    CsvTable::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse every row into `out`; returns the number of rows that were skipped
fn collect<T>(table: &CsvTable, parse: fn(&CsvTable) -> Vec<Option<T>>, out: &mut Vec<T>) -> usize {
    let parsed = parse(table);
    let total = parsed.len();
    let before = out.len();
    out.extend(parsed.into_iter().flatten());
    total - (out.len() - before)
}

fn parse_autoscaler(table: &CsvTable) -> Vec<Option<Sample>> {
    let ts = table.column(&["timestamp"]);
    let current = table.column(&["currentReplicas", "current_replicas"]);
    let desired = table.column(&["desiredReplicas", "desired_replicas"]);
    let util = table.column(&["currentCPUUtilizationPercent", "cpu_utilization_percent"]);
    let rps = table.column(&["httpRequestsPerSecond", "http_requests_per_second"]);

    table
        .rows()
        .map(|row| {
            Some(Sample {
                timestamp: row.timestamp(ts)?,
                current_replicas: row.count(current)?,
                desired_replicas: row.count(desired),
                current_cpu_utilization_percent: row.number(util),
                http_requests_per_second: row.number(rps),
            })
        })
        .collect()
}

fn parse_phases(table: &CsvTable) -> Vec<Option<PhaseEvent>> {
    let ts = table.column(&["timestamp"]);
    let phase = table.column(&["phase"]);
    let action = table.column(&["action"]);

    table
        .rows()
        .map(|row| {
            Some(PhaseEvent {
                timestamp: row.timestamp(ts)?,
                phase: Phase::parse(row.get(phase)?),
                action: PhaseAction::parse(row.get(action)?)?,
            })
        })
        .collect()
}

fn parse_pod_cpu(table: &CsvTable) -> Vec<Option<PodCpuSample>> {
    let ts = table.column(&["timestamp"]);
    let pod = table.column(&["pod", "podId", "pod_name", "name"]);
    let cpu = table.column(&["cpu"]);

    table
        .rows()
        .map(|row| {
            Some(PodCpuSample {
                timestamp: row.timestamp(ts)?,
                pod_id: row.get(pod).unwrap_or_default().to_string(),
                raw_cpu: row.get(cpu)?.to_string(),
            })
        })
        .collect()
}

fn parse_dedicated_rate(table: &CsvTable) -> Vec<Option<RatePoint>> {
    let ts = table.column(&["timestamp"]);
    let total = table.column(&["total_rps"]);

    table
        .rows()
        .map(|row| {
            Some(RatePoint {
                timestamp: row.timestamp(ts)?,
                value: row.number(total),
            })
        })
        .collect()
}

fn parse_scraped(table: &CsvTable) -> Vec<Option<ScrapedMetric>> {
    let ts = table.column(&["timestamp"]);
    let pod = table.column(&["pod", "podId", "pod_name"]);
    let metric = table.column(&["metric"]);
    let value = table.column(&["value"]);

    table
        .rows()
        .map(|row| {
            Some(ScrapedMetric {
                timestamp: row.timestamp(ts)?,
                pod: row.get(pod).map(str::to_string),
                metric: row.get(metric)?.to_string(),
                value: row.number(value),
            })
        })
        .collect()
}
