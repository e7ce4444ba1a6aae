//! CLI subcommands

pub mod analyze;
pub mod runs;
pub mod show;

use analysis_lib::ingest::{load_run, RunSource};
use analysis_lib::{RunSummarizer, RunTelemetry, StructuredLogger};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::CliConfig;
use crate::output::OutputFormat;

/// State shared by every subcommand
pub struct Session {
    pub config: CliConfig,
    pub results_dir: PathBuf,
    pub format: OutputFormat,
    pub logger: StructuredLogger,
}

impl Session {
    pub fn new(config: CliConfig, results_dir: PathBuf, format: OutputFormat) -> Self {
        let logger = StructuredLogger::new(experiment_name(&results_dir));
        Self {
            config,
            results_dir,
            format,
            logger,
        }
    }

    pub fn sources(&self) -> Result<Vec<RunSource>> {
        self.config.run_sources(&self.results_dir)
    }

    /// Load every run; a run whose directory cannot be read is skipped with a warning
    pub fn load(&self, sources: &[RunSource]) -> Vec<RunTelemetry> {
        sources
            .iter()
            .filter_map(|source| match load_run(source, &self.logger) {
                Ok(run) => Some(run),
                Err(e) => {
                    let error = format!("{:#}", e);
                    warn!(run = %source.label, error = %error, "Skipping unreadable run");
                    None
                }
            })
            .collect()
    }

    pub fn summarizer(&self) -> RunSummarizer {
        RunSummarizer::new(self.config.analysis.clone(), self.logger.clone())
    }
}

/// Experiment name for log events, taken from the results directory
fn experiment_name(results_dir: &Path) -> String {
    results_dir
        .canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(results_dir)
        .parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default".to_string())
}
