//! Single-run detail command

use analysis_lib::{MetricName, RunSummary};
use anyhow::{Context, Result};
use colored::Colorize;

use super::Session;
use crate::output::{color_utilization, format_metric, print_json, print_warning, OutputFormat};

/// Show the derived metrics of one run
pub fn show_run(session: &Session, label: &str) -> Result<()> {
    let sources = session.sources()?;
    let source = sources
        .iter()
        .find(|source| source.label == label)
        .with_context(|| {
            let known: Vec<&str> = sources.iter().map(|s| s.label.as_str()).collect();
            format!("Unknown run '{}'. Known runs: {}", label, known.join(", "))
        })?;

    let run = analysis_lib::ingest::load_run(source, &session.logger)?;
    let summary = session.summarizer().summarize(&run);

    match session.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_details(&summary, session.config.analysis.target_utilization_percent),
    }

    Ok(())
}

fn print_details(summary: &RunSummary, target_util: f64) {
    println!("{} {}", "Run:".bold(), summary.label.cyan());
    println!("{}", "=".repeat(50));

    if summary.metrics.is_empty() {
        print_warning("No metrics could be derived (missing autoscaler samples or phase markers)");
        return;
    }

    for name in MetricName::ALL {
        let value = match (name, summary.metrics.avg_cpu_util) {
            (MetricName::AvgCpuUtil, Some(util)) => color_utilization(util, target_util),
            _ => format_metric(summary.metrics.get(name)),
        };
        println!("{:<28}{}", name.as_str(), value);
    }

    println!();
    println!("{}", "Context".bold());
    println!("{}", "-".repeat(50));
    println!(
        "{:<28}{}",
        "throughput_source",
        summary
            .throughput_source
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "{:<28}{}",
        "stabilized_at",
        summary
            .stabilized_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string())
    );

    if summary.malformed_cpu_samples > 0 {
        println!();
        print_warning(&format!(
            "{} CPU reading(s) could not be parsed and were excluded from pod_cpu_std_dev",
            summary.malformed_cpu_samples
        ));
    }
}
