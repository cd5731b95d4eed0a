//! Chunk Stream Generator
//!
//! Walks an aligned [`RangeWindow`] one backend chunk at a time and yields
//! buffers trimmed to exactly the requested bytes. The stream is pull-based:
//! the next chunk is fetched only when the consumer polls for it, so at most
//! one chunk is held in memory per response.
//!
//! A backend error is yielded once and ends the stream. A short read before
//! the final chunk ends the stream quietly after delivering what was read.

use crate::error::Result;
use crate::load_tracker::LoadGuard;
use crate::metrics::GatewayMetrics;
use crate::models::{FileLocation, RangeWindow};
use crate::streamer::SessionStreamer;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Lazy, ordered, single-use sequence of body buffers
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// Trim a fetched chunk to the bytes the window wants from it
///
/// - single-part windows keep `[first_cut, last_cut)`
/// - the first of several parts keeps `[first_cut, ..)`
/// - the last of several parts keeps `[.., last_cut)`
/// - middle parts pass through untouched
///
/// Bounds are clamped to what was actually fetched.
pub fn trim_chunk(chunk: Bytes, part: u64, window: &RangeWindow) -> Bytes {
    let len = chunk.len() as u64;
    let start = if part == 0 { window.first_cut } else { 0 };
    let end = if part + 1 == window.part_count {
        window.last_cut.min(len)
    } else {
        len
    };

    if start >= end {
        return Bytes::new();
    }
    chunk.slice(start as usize..end as usize)
}

struct StreamState {
    streamer: Arc<SessionStreamer>,
    location: FileLocation,
    window: RangeWindow,
    part: u64,
    finished: bool,
    metrics: Option<Arc<GatewayMetrics>>,
    // Released when the state is dropped: completion, error or disconnect.
    _guard: Option<LoadGuard>,
}

impl StreamState {
    fn next_offset(&self) -> u64 {
        self.window.offset + self.part * self.window.chunk_size
    }
}

impl Drop for StreamState {
    fn drop(&mut self) {
        if let Some(metrics) = &self.metrics {
            metrics.active_streams.dec();
        }
        debug!(
            "Stream on session {} closed after {}/{} parts",
            self.streamer.session_index(),
            self.part,
            self.window.part_count
        );
    }
}

/// Build the body stream for a planned window
///
/// `guard` is held until the stream is dropped, so the session's load is
/// released on every exit path.
pub fn chunk_stream(
    streamer: Arc<SessionStreamer>,
    location: FileLocation,
    window: RangeWindow,
    guard: Option<LoadGuard>,
    metrics: Option<Arc<GatewayMetrics>>,
) -> ChunkStream {
    if let Some(metrics) = &metrics {
        metrics.active_streams.inc();
    }

    let state = StreamState {
        streamer,
        location,
        window,
        part: 0,
        finished: false,
        metrics,
        _guard: guard,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished || state.part >= state.window.part_count {
            return None;
        }

        let offset = state.next_offset();
        let chunk_size = state.window.chunk_size;
        let started = Instant::now();

        let chunk = match state
            .streamer
            .fetch(&state.location, offset, chunk_size)
            .await
        {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(
                    "Fetch failed at offset {} (part {}/{}) on session {}, aborting stream: {}",
                    offset,
                    state.part + 1,
                    state.window.part_count,
                    state.streamer.session_index(),
                    e
                );
                if let Some(metrics) = &state.metrics {
                    metrics.record_fetch("error", started.elapsed());
                }
                state.finished = true;
                return Some((Err(e), state));
            }
        };

        let is_last = state.part + 1 == state.window.part_count;
        let short = !is_last && (chunk.len() as u64) < chunk_size;

        if let Some(metrics) = &state.metrics {
            let result = if short { "short" } else { "ok" };
            metrics.record_fetch(result, started.elapsed());
        }

        debug!(
            "Fetched part {}/{} at offset {} ({} bytes)",
            state.part + 1,
            state.window.part_count,
            offset,
            chunk.len()
        );

        let piece = trim_chunk(chunk, state.part, &state.window);
        state.part += 1;

        if short {
            warn!(
                "Short read at offset {} ({} parts expected), truncating stream",
                offset, state.window.part_count
            );
            state.finished = true;
        }

        if piece.is_empty() {
            return None;
        }

        if let Some(metrics) = &state.metrics {
            metrics.record_bytes_sent(piece.len() as u64);
        }
        Some((Ok(piece), state))
    })
    .boxed()
}
