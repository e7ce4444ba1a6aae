//! Request counter exposition
//!
//! The counter is registered in a registry owned by the server rather than the
//! process-wide default registry, so independent servers (and tests) never share it.

use analysis_lib::REQUESTS_TOTAL_METRIC;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

/// Content type of the text exposition format
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Server metrics handle; clones share the same counter
#[derive(Clone)]
pub struct ServerMetrics {
    registry: Registry,
    requests_total: IntCounter,
}

impl ServerMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let requests_total = IntCounter::with_opts(Opts::new(
            REQUESTS_TOTAL_METRIC,
            "Total number of HTTP requests received.",
        ))?;
        registry.register(Box::new(requests_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
        })
    }

    /// Count one served workload request
    pub fn inc_requests(&self) {
        self.requests_total.inc();
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.get()
    }

    /// Render all registered metrics in the text exposition format
    pub fn encode(&self) -> prometheus::Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_starts_at_zero_and_is_shared() {
        let metrics = ServerMetrics::new().unwrap();
        let clone = metrics.clone();
        assert_eq!(metrics.requests_total(), 0);

        clone.inc_requests();
        clone.inc_requests();
        assert_eq!(metrics.requests_total(), 2);
    }

    #[test]
    fn test_servers_do_not_share_counters() {
        let a = ServerMetrics::new().unwrap();
        let b = ServerMetrics::new().unwrap();
        a.inc_requests();
        assert_eq!(b.requests_total(), 0);
    }

    #[test]
    fn test_exposition_format() {
        let metrics = ServerMetrics::new().unwrap();
        metrics.inc_requests();

        let body = String::from_utf8(metrics.encode().unwrap()).unwrap();
        assert!(body.contains("# TYPE http_requests_total counter"));
        assert!(body.contains("http_requests_total 1"));
    }
}
