//! Derived-metric algorithms
//!
//! Each submodule computes one family of metrics from a run's telemetry:
//! - CPU quantity normalization and per-pod dispersion
//! - Load-increase and scale-up event detection
//! - Replica plateau (stabilization) detection
//! - Utilization averaging and tracking-error area
//! - Throughput source reconciliation
//! - Replica-time cost

mod cost;
mod events;
mod quantity;
mod stabilization;
pub mod stats;
mod throughput;
mod utilization;

pub use cost::{max_replicas, pod_seconds};
pub use events::{detect_scale_up, ScaleUpEvent};
pub use quantity::{parse_cpu_millis, pod_cpu_dispersion, CpuDispersion, MILLI_SUFFIX};
pub use stabilization::{Plateau, StabilizationDetector};
pub use throughput::{
    select_candidate, ThroughputCandidate, ThroughputReconciler, ThroughputSource,
    ThroughputSummary,
};
pub use utilization::UtilizationIntegrator;
