//! HPA experiment analysis CLI
//!
//! Reads the telemetry recorded by autoscaling experiment runs, derives comparable
//! per-run metrics and writes a summary table and a chart dashboard.

mod commands;
mod config;
mod output;
mod plots;

use analysis_lib::metrics::ThroughputSource;
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{analyze, runs, show, Session};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// HPA experiment analysis CLI
#[derive(Parser)]
#[command(name = "hpa-analyze")]
#[command(author, version, about = "Analyze HPA autoscaling experiment runs", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Path to a TOML config file (default: ~/.config/hpa-analyze/config.toml)
    #[arg(long, global = true, env = "HPA_ANALYZE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target CPU utilization of the autoscaler, in percent
    #[arg(long, global = true)]
    pub target_util: Option<f64>,

    /// Minimum seconds of unchanged replicas that count as stabilized
    #[arg(long, global = true)]
    pub plateau_secs: Option<f64>,

    /// Nominal sampling interval in seconds for the pod-seconds estimate
    #[arg(long, global = true)]
    pub sample_interval: Option<u64>,

    /// Throughput sources in order of trust, comma separated
    /// (dedicated_rate, hpa_custom_metric, derived_counter_rate)
    #[arg(long, global = true, value_delimiter = ',')]
    pub throughput_order: Option<Vec<ThroughputSource>>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize all runs and write the summary table and dashboard
    Analyze {
        /// Directory holding the run directories
        #[arg(default_value = "results")]
        results_dir: PathBuf,

        /// Output directory (default: RESULTS_DIR/plots)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Skip the chart dashboard
        #[arg(long)]
        no_plots: bool,
    },

    /// List discovered runs and the telemetry streams each recorded
    Runs {
        /// Directory holding the run directories
        #[arg(default_value = "results")]
        results_dir: PathBuf,
    },

    /// Show the derived metrics of a single run
    Show {
        /// Run label as listed by `runs`
        label: String,

        /// Directory holding the run directories
        #[arg(default_value = "results")]
        results_dir: PathBuf,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so JSON output on stdout stays parseable
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let config = config::CliConfig::load(cli.config.as_deref())?.apply_overrides(
        config::Overrides {
            target_util: cli.target_util,
            plateau_secs: cli.plateau_secs,
            sample_interval: cli.sample_interval,
            throughput_order: cli.throughput_order,
        },
    )?;

    match cli.command {
        Commands::Analyze {
            results_dir,
            output,
            no_plots,
        } => {
            let session = Session::new(config, results_dir, cli.format);
            analyze::analyze(&session, output, no_plots)?;
        }
        Commands::Runs { results_dir } => {
            let session = Session::new(config, results_dir, cli.format);
            runs::list_runs(&session)?;
        }
        Commands::Show { label, results_dir } => {
            let session = Session::new(config, results_dir, cli.format);
            show::show_run(&session, &label)?;
        }
    }

    Ok(())
}
