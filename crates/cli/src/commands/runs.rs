//! Run listing command

use analysis_lib::{ingest::RunSource, StreamKind};
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use super::Session;
use crate::output::{format_presence, print_json, print_rows, OutputFormat};

/// Row for the run listing table
#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Run")]
    label: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "HPA log")]
    autoscaler: String,
    #[tabled(rename = "Streams")]
    streams: String,
}

#[derive(Serialize)]
struct RunListing<'a> {
    label: &'a str,
    path: String,
    streams: Vec<&'static str>,
}

/// List the runs that would be analyzed and the streams each one recorded
pub fn list_runs(session: &Session) -> Result<()> {
    let sources = session.sources()?;

    match session.format {
        OutputFormat::Json => {
            let listings: Vec<RunListing> = sources.iter().map(listing).collect();
            print_json(&listings)?;
        }
        OutputFormat::Table => {
            let rows: Vec<RunRow> = sources.iter().map(row).collect();
            print_rows(&rows);
        }
    }

    Ok(())
}

fn listing(source: &RunSource) -> RunListing<'_> {
    RunListing {
        label: &source.label,
        path: source.path.display().to_string(),
        streams: source
            .available_streams()
            .iter()
            .map(StreamKind::file_name)
            .collect(),
    }
}

fn row(source: &RunSource) -> RunRow {
    let streams = source.available_streams();
    RunRow {
        label: source.label.clone(),
        path: source.path.display().to_string(),
        autoscaler: format_presence(streams.contains(&StreamKind::Autoscaler)),
        streams: streams
            .iter()
            .map(StreamKind::file_name)
            .collect::<Vec<_>>()
            .join(", "),
    }
}
