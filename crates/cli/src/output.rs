//! Output formatting utilities

use analysis_lib::MetricValue;
use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of rows
pub fn print_rows<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No runs found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a table whose columns are only known at runtime
pub fn print_dynamic_table(header: Vec<String>, records: Vec<Vec<String>>) {
    let mut builder = Builder::default();
    builder.push_record(header);
    for record in records {
        builder.push_record(record);
    }
    let table = builder.build().with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Render a metric cell; undefined metrics show as a dash
pub fn format_metric(value: Option<MetricValue>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "-".dimmed().to_string(),
    }
}

/// Color an average utilization by its distance from the target
pub fn color_utilization(util: f64, target: f64) -> String {
    let formatted = format!("{:.1}%", util);
    let deviation = (util - target).abs();
    if deviation <= 5.0 {
        formatted.green().to_string()
    } else if deviation <= 15.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Yes/no marker for stream presence
pub fn format_presence(present: bool) -> String {
    if present {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}
