//! CPU-burning HTTP workload
//!
//! Every request to `/` burns a fixed slice of CPU and bumps a request counter that
//! the experiment's metrics scraper reads from `/metrics`. The counter lives in the
//! server state, so it exists exactly as long as the server does.

pub mod api;
pub mod config;
pub mod metrics;

pub use api::{burn_cpu, create_router, serve, AppState};
pub use config::ServerConfig;
pub use metrics::ServerMetrics;
