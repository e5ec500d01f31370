//! Metrics collection for observability

use prometheus::{
    CounterVec, Histogram, Opts, Registry,
    register_counter_vec_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;
use std::time::Duration;
use once_cell::sync::Lazy;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Router metrics
    pub messages: CounterVec,

    // Cache metrics
    pub cache_lookups: CounterVec,

    // Backend metrics
    pub backend_requests: CounterVec,
    pub backend_request_duration: Histogram,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let messages = register_counter_vec_with_registry!(
            Opts::new("clarity_messages_total", "Total routed messages"),
            &["kind", "status"],
            registry
        )?;

        let cache_lookups = register_counter_vec_with_registry!(
            Opts::new("clarity_cache_lookups_total", "Result cache lookups"),
            &["result"],
            registry
        )?;

        let backend_requests = register_counter_vec_with_registry!(
            Opts::new("clarity_backend_requests_total", "Calls to the explanation backend"),
            &["outcome"],
            registry
        )?;

        let backend_request_duration = register_histogram_with_registry!(
            "clarity_backend_request_duration_seconds",
            "Explanation backend call duration in seconds",
            registry
        )?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            messages,
            cache_lookups,
            backend_requests,
            backend_request_duration,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a routed message
    pub fn record_message(&self, kind: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.messages.with_label_values(&[kind, status]).inc();
    }

    /// Record a cache lookup (`hit`, `miss` or `expired`)
    pub fn record_cache_lookup(&self, result: &str) {
        self.cache_lookups.with_label_values(&[result]).inc();
    }

    /// Record a backend call and how long it took
    pub fn record_backend_call(&self, outcome: &str, elapsed: Duration) {
        self.backend_requests.with_label_values(&[outcome]).inc();
        self.backend_request_duration.observe(elapsed.as_secs_f64());
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
