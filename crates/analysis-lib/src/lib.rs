//! Analysis library for HPA load experiments
//!
//! This crate turns the telemetry recorded during an autoscaling experiment into
//! comparable per-run scalars:
//! - CPU quantity normalization and per-pod dispersion
//! - Scale-up and stabilization detection
//! - Utilization averaging and tracking-error integration
//! - Throughput source reconciliation
//! - Replica-time cost estimation
//! - Cross-run summary tables
//!
//! CSV ingestion of run directories lives in [`ingest`]; everything else is a pure
//! function of the loaded [`RunTelemetry`].

pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod summary;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use models::*;
pub use observability::StructuredLogger;
pub use summary::{summarize_run, RunSummarizer, RunSummary, SummaryTable};
