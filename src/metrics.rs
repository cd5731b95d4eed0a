//! Prometheus metrics for the gateway

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metrics collected while serving streams
///
/// Uses a private registry so several gateways can coexist in one process.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,

    /// Responses by status code
    pub requests_total: IntCounterVec,

    /// Body bytes handed to clients
    pub bytes_sent_total: IntCounter,

    /// Backend chunk fetches by result (ok, short, error)
    pub backend_fetches_total: IntCounterVec,

    /// Resolution attempts repeated on another session
    pub resolve_retries_total: IntCounter,

    /// Streams currently in flight
    pub active_streams: IntGauge,

    /// Duration of backend chunk fetches
    pub fetch_duration_seconds: Histogram,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("stream_gateway_requests_total", "Total number of stream requests"),
            &["status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let bytes_sent_total = IntCounter::new(
            "stream_gateway_bytes_sent_total",
            "Total body bytes sent to clients",
        )?;
        registry.register(Box::new(bytes_sent_total.clone()))?;

        let backend_fetches_total = IntCounterVec::new(
            Opts::new(
                "stream_gateway_backend_fetches_total",
                "Total number of backend chunk fetches",
            ),
            &["result"], // result: ok, short, error
        )?;
        registry.register(Box::new(backend_fetches_total.clone()))?;

        let resolve_retries_total = IntCounter::new(
            "stream_gateway_resolve_retries_total",
            "Resolution attempts retried on another session",
        )?;
        registry.register(Box::new(resolve_retries_total.clone()))?;

        let active_streams = IntGauge::new(
            "stream_gateway_active_streams",
            "Number of streams currently being served",
        )?;
        registry.register(Box::new(active_streams.clone()))?;

        let fetch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "stream_gateway_fetch_duration_seconds",
                "Duration of backend chunk fetches in seconds",
            )
            .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(fetch_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            bytes_sent_total,
            backend_fetches_total,
            resolve_retries_total,
            active_streams,
            fetch_duration_seconds,
        })
    }

    pub fn record_response(&self, status: u16) {
        let label = status.to_string();
        self.requests_total
            .with_label_values(&[label.as_str()])
            .inc();
    }

    pub fn record_fetch(&self, result: &str, duration: Duration) {
        self.backend_fetches_total.with_label_values(&[result]).inc();
        self.fetch_duration_seconds.observe(duration.as_secs_f64());
    }

    pub fn record_bytes_sent(&self, bytes: u64) {
        self.bytes_sent_total.inc_by(bytes);
    }

    pub fn record_resolve_retry(&self) {
        self.resolve_retries_total.inc();
    }

    /// Render all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
