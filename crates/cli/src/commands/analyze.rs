//! Batch analysis command

use analysis_lib::ingest::OUTPUT_DIR_NAME;
use analysis_lib::SummaryTable;
use anyhow::{Context, Result};
use std::path::PathBuf;

use super::Session;
use crate::output::{format_metric, print_dynamic_table, print_info, print_json, print_success, OutputFormat};
use crate::plots::{DashboardData, DASHBOARD_FILE};

/// File name of the comparison table inside the output directory
pub const SUMMARY_FILE: &str = "summary_table.csv";

/// Summarize every run, print the comparison table and write the artifacts
///
/// Fails when no run has autoscaler telemetry.
pub fn analyze(session: &Session, output: Option<PathBuf>, no_plots: bool) -> Result<()> {
    let sources = session.sources()?;
    let runs = session.load(&sources);

    let table = session
        .summarizer()
        .summarize_all(&runs)
        .with_context(|| {
            format!(
                "Nothing to analyze in {} ({} run(s) found)",
                session.results_dir.display(),
                sources.len()
            )
        })?
        .with_index_name("experiment");

    let out_dir = output.unwrap_or_else(|| session.results_dir.join(OUTPUT_DIR_NAME));
    let csv_path = out_dir.join(SUMMARY_FILE);
    table.write_csv(&csv_path)?;

    let dashboard_path = if no_plots {
        None
    } else {
        let path = out_dir.join(DASHBOARD_FILE);
        DashboardData::build(&runs, &session.config.analysis).write(&path)?;
        Some(path)
    };

    match session.format {
        OutputFormat::Json => print_json(&table)?,
        OutputFormat::Table => {
            print_summary(&table);
            println!();
            print_success(&format!("Summary table written to {}", csv_path.display()));
            match dashboard_path {
                Some(path) => print_success(&format!("Dashboard written to {}", path.display())),
                None => print_info("Dashboard skipped"),
            }
        }
    }

    Ok(())
}

fn print_summary(table: &SummaryTable) {
    let columns = table.columns();

    let mut header = vec!["experiment".to_string()];
    header.extend(columns.iter().map(|c| c.as_str().to_string()));
    header.push("throughput_source".to_string());

    let records = table
        .rows()
        .iter()
        .map(|row| {
            let mut record = vec![row.label.clone()];
            record.extend(columns.iter().map(|c| format_metric(row.metrics.get(*c))));
            record.push(
                row.throughput_source
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
            record
        })
        .collect();

    print_dynamic_table(header, records);
}
