//! Configuration management for the CLI
//!
//! Layers, lowest precedence first: built-in defaults, the TOML config file, then
//! `HPA_ANALYZE_*` environment variables. Command-line flags are applied on top by
//! [`CliConfig::apply_overrides`].

use analysis_lib::{ingest::RunSource, AnalysisConfig};
use analysis_lib::metrics::ThroughputSource;
use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "HPA_ANALYZE";

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Derived-metric tunables
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Explicit run list; when empty, runs are discovered under the results directory
    #[serde(default)]
    pub runs: Vec<RunSource>,
}

/// Analysis settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target_util: Option<f64>,
    pub plateau_secs: Option<f64>,
    pub sample_interval: Option<u64>,
    pub throughput_order: Option<Vec<ThroughputSource>>,
}

impl CliConfig {
    /// Load configuration from the config file and environment
    ///
    /// An explicitly given file must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match explicit {
            Some(path) => {
                builder = builder.add_source(
                    File::from(path.to_path_buf())
                        .format(FileFormat::Toml)
                        .required(true),
                );
            }
            None => {
                if let Some(path) = Self::config_path() {
                    builder = builder.add_source(
                        File::from(path).format(FileFormat::Toml).required(false),
                    );
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("analysis.throughput_order")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Apply command-line flags, then validate the merged settings
    pub fn apply_overrides(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(target) = overrides.target_util {
            self.analysis.target_utilization_percent = target;
        }
        if let Some(secs) = overrides.plateau_secs {
            self.analysis.plateau_threshold_secs = secs;
        }
        if let Some(interval) = overrides.sample_interval {
            self.analysis.sample_interval_secs = interval;
        }
        if let Some(order) = overrides.throughput_order {
            self.analysis.throughput_order = order;
        }

        self.analysis
            .validate()
            .context("Invalid analysis configuration")?;
        Ok(self)
    }

    /// Runs to analyze under `results_dir`
    ///
    /// Configured runs win over discovery. Relative run paths are resolved against
    /// the results directory.
    pub fn run_sources(&self, results_dir: &Path) -> Result<Vec<RunSource>> {
        if self.runs.is_empty() {
            return analysis_lib::ingest::discover_runs(results_dir);
        }

        let mut sources: Vec<RunSource> = self
            .runs
            .iter()
            .map(|run| {
                let path = if run.path.is_relative() {
                    results_dir.join(&run.path)
                } else {
                    run.path.clone()
                };
                RunSource::new(&run.label, path)
            })
            .collect();
        sources.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(sources)
    }

    /// Default configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| {
            home.join(".config")
                .join("hpa-analyze")
                .join("config.toml")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_explicit_file_is_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[analysis]
target_utilization_percent = 70.0
throughput_order = ["derived_counter_rate", "dedicated_rate"]

[[runs]]
label = "baseline"
path = "pcm-cpu/60s"
"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.analysis.target_utilization_percent, 70.0);
        assert_eq!(config.analysis.plateau_threshold_secs, 60.0);
        assert_eq!(
            config.analysis.throughput_order,
            vec![
                ThroughputSource::DerivedCounterRate,
                ThroughputSource::DedicatedRate
            ]
        );
        assert_eq!(config.runs.len(), 1);
        assert_eq!(config.runs[0].label, "baseline");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        let result = CliConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = CliConfig::default()
            .apply_overrides(Overrides {
                target_util: Some(50.0),
                sample_interval: Some(15),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.analysis.target_utilization_percent, 50.0);
        assert_eq!(config.analysis.sample_interval_secs, 15);
        assert_eq!(config.analysis.plateau_threshold_secs, 60.0);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result = CliConfig::default().apply_overrides(Overrides {
            plateau_secs: Some(-1.0),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_configured_runs_resolve_against_results_dir() {
        let config = CliConfig {
            runs: vec![
                RunSource::new("b", "second"),
                RunSource::new("a", "/abs/first"),
            ],
            ..Default::default()
        };

        let sources = config.run_sources(Path::new("/data/results")).unwrap();
        assert_eq!(sources[0], RunSource::new("a", "/abs/first"));
        assert_eq!(sources[1], RunSource::new("b", "/data/results/second"));
    }
}
