//! Stream gateway orchestration
//!
//! Ties the pieces together for one request:
//! capability check → session selection and resolution (with retry on a
//! different session) → range planning → header assembly → chunk stream.

use crate::backend::{CapabilityValidator, MetadataStore, SessionPool};
use crate::chunk_stream::chunk_stream;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::load_tracker::LoadTracker;
use crate::metrics::GatewayMetrics;
use crate::models::{FileDescriptor, FileId, RangeWindow};
use crate::range_planner::RangePlanner;
use crate::responder::{self, GatewayBody};
use crate::streamer::{SessionStreamer, StreamerCache};
use http::{HeaderMap, Response, StatusCode};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Everything needed to answer a request, computed before the first body byte
pub struct PreparedStream {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub window: RangeWindow,
    pub descriptor: FileDescriptor,
    pub streamer: Arc<SessionStreamer>,
}

/// Streaming gateway shared by all request tasks
pub struct StreamGateway {
    config: Arc<GatewayConfig>,
    planner: RangePlanner,
    tracker: Arc<LoadTracker>,
    cache: StreamerCache,
    validator: Arc<dyn CapabilityValidator>,
    metrics: Arc<GatewayMetrics>,
    started_at: Instant,
}

impl StreamGateway {
    /// Create a gateway over a session pool
    ///
    /// The pool must be non-empty; `SessionPool::new` already enforces it.
    pub fn new(
        config: Arc<GatewayConfig>,
        pool: SessionPool,
        store: Arc<dyn MetadataStore>,
        validator: Arc<dyn CapabilityValidator>,
    ) -> Result<Self> {
        let metrics = GatewayMetrics::new()
            .map_err(|e| GatewayError::InternalError(format!("Failed to create metrics: {}", e)))?;

        Ok(StreamGateway {
            planner: RangePlanner::new(config.chunk_size),
            tracker: Arc::new(LoadTracker::new(pool.len())),
            cache: StreamerCache::new(pool, store, config.fetch_timeout()),
            validator,
            metrics: Arc::new(metrics),
            started_at: Instant::now(),
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<LoadTracker> {
        &self.tracker
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    pub fn streamer_cache(&self) -> &StreamerCache {
        &self.cache
    }

    /// Resolve a file on the least-loaded session
    ///
    /// A `BackendUnavailable` failure moves on to the next least-loaded
    /// session not yet tried, up to `max_resolve_attempts` sessions. Other
    /// errors return immediately.
    pub async fn resolve(&self, file_id: &FileId) -> Result<(Arc<SessionStreamer>, FileDescriptor)> {
        let attempts = self.config.max_resolve_attempts.min(self.tracker.len()).max(1);
        let mut tried = Vec::with_capacity(attempts);
        let mut last_error = None;

        while tried.len() < attempts {
            let Some(index) = self.tracker.select_excluding(&tried) else {
                break;
            };
            tried.push(index);

            let streamer = self.cache.get(index).ok_or_else(|| {
                GatewayError::InternalError(format!("session index {} outside pool", index))
            })?;
            info!(
                "Session {} ({}) selected for file {}",
                index,
                streamer.session_name(),
                file_id.key
            );

            match streamer.resolve(&file_id.key).await {
                Ok(descriptor) => return Ok((streamer, descriptor)),
                Err(e) if e.should_retry() => {
                    warn!(
                        "Resolution of {} failed on session {} (attempt {}/{}): {}",
                        file_id.key,
                        index,
                        tried.len(),
                        attempts,
                        e
                    );
                    if tried.len() < attempts {
                        self.metrics.record_resolve_retry();
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            GatewayError::InternalError("no session available for resolution".to_string())
        }))
    }

    /// Validate, resolve and plan a request without starting the stream
    pub async fn prepare(&self, segment: &str, range_header: Option<&str>) -> Result<PreparedStream> {
        let file_id = FileId::parse(segment, self.config.hash_length)?;
        if !self.validator.validate(&file_id).await {
            return Err(GatewayError::InvalidCapability(file_id.key));
        }

        let (streamer, descriptor) = self.resolve(&file_id).await?;
        let window = self.planner.plan(range_header, descriptor.size)?;
        let (status, headers) = responder::build_response_header(&window, &descriptor)?;

        Ok(PreparedStream {
            status,
            headers,
            window,
            descriptor,
            streamer,
        })
    }

    /// Answer a stream request
    ///
    /// HEAD requests (`head_only`) get the same status and headers with an
    /// empty body and never touch the load counters.
    pub async fn serve(
        &self,
        segment: &str,
        range_header: Option<&str>,
        head_only: bool,
    ) -> Response<GatewayBody> {
        let started = Instant::now();

        let prepared = match self.prepare(segment, range_header).await {
            Ok(prepared) => prepared,
            Err(e) => return self.failure(segment, &e),
        };

        let PreparedStream {
            status,
            headers,
            window,
            descriptor,
            streamer,
        } = prepared;
        self.metrics.record_response(status.as_u16());

        info!(
            "Serving {} ({}) bytes {}-{}/{} status={} via session {} in {:?}",
            descriptor.id,
            descriptor.display_name,
            window.from_byte,
            window.to_byte,
            window.file_size,
            status.as_u16(),
            streamer.session_index(),
            started.elapsed()
        );

        if head_only || window.part_count == 0 {
            return responder::build_response(status, headers, responder::empty_body());
        }

        let guard = self.tracker.acquire(streamer.session_index());
        let stream = chunk_stream(
            streamer,
            descriptor.location,
            window,
            Some(guard),
            Some(Arc::clone(&self.metrics)),
        );
        responder::build_response(status, headers, responder::stream_body(stream))
    }

    fn failure(&self, segment: &str, err: &GatewayError) -> Response<GatewayBody> {
        let status = err.to_http_status();
        match status {
            500 => error!("Request for {} failed: {}", segment, err),
            _ => debug!("Request for {} rejected with {}: {}", segment, status, err),
        }
        self.metrics.record_response(status);
        responder::error_response(err)
    }

    /// Server status document
    pub fn status(&self) -> Value {
        let mut loads: Vec<(usize, usize)> = self.tracker.snapshot().into_iter().enumerate().collect();
        loads.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut load_map = Map::new();
        for (index, load) in loads {
            load_map.insert(format!("session{}", index + 1), json!(load));
        }

        let mut status = json!({
            "server_status": "running",
            "uptime": readable_duration(self.started_at.elapsed()),
            "connected_sessions": self.cache.pool().len(),
            "loads": Value::Object(load_map),
            "version": env!("CARGO_PKG_VERSION"),
        });
        if let (Some(url), Some(obj)) = (&self.config.public_url, status.as_object_mut()) {
            obj.insert("public_url".to_string(), json!(url));
        }
        status
    }
}

/// Format a duration as e.g. `1d 2h 3m 4s`, omitting leading zero units
pub fn readable_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3_600;
    secs %= 3_600;
    let minutes = secs / 60;
    secs %= 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 || !parts.is_empty() {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 || !parts.is_empty() {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", secs));
    parts.join(" ")
}
