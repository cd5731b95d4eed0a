//! Range Planner
//!
//! Parses the client's `Range` header and aligns the requested window to
//! backend chunk boundaries.

use crate::error::{GatewayError, Result};
use crate::models::RangeWindow;
use tracing::debug;

/// A syntactically valid `bytes=<from>-<to>` header with optional bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedRange {
    pub from: Option<u64>,
    pub to: Option<u64>,
}

/// Parse a Range header value
///
/// Accepts `bytes=<from>-<to>` where either side may be empty. Anything
/// else, including multi-range lists, returns `None`.
pub fn parse_range_header(value: &str) -> Option<RequestedRange> {
    let rest = value.trim().strip_prefix("bytes=")?;
    let (from, to) = rest.split_once('-')?;

    Some(RequestedRange {
        from: parse_bound(from)?,
        to: parse_bound(to)?,
    })
}

// Outer None: malformed. Inner None: empty bound.
// Digit runs too large for u64 saturate so they fail as unsatisfiable.
fn parse_bound(raw: &str) -> Option<Option<u64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(None);
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(Some(raw.parse::<u64>().unwrap_or(u64::MAX)))
}

/// Planner bound to one backend chunk size
#[derive(Debug, Clone, Copy)]
pub struct RangePlanner {
    chunk_size: u64,
}

impl RangePlanner {
    pub fn new(chunk_size: u64) -> Self {
        RangePlanner { chunk_size }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Compute the chunk window for a request
    ///
    /// # Behavior
    /// - No header, or a malformed one: the whole file, status 200
    /// - Valid header: missing `from` is 0, missing `to` is `file_size - 1`,
    ///   status 206
    /// - `to > file_size` or `to < from`: `RangeNotSatisfiable`
    /// - `to` is clamped to `file_size - 1` before the geometry is computed
    pub fn plan(&self, range_header: Option<&str>, file_size: u64) -> Result<RangeWindow> {
        let requested = range_header.and_then(|value| {
            let parsed = parse_range_header(value);
            if parsed.is_none() {
                debug!("Ignoring malformed Range header '{}'", value);
            }
            parsed
        });
        let partial = requested.is_some();

        if file_size == 0 {
            if partial {
                return Err(GatewayError::RangeNotSatisfiable { file_size });
            }
            return Ok(RangeWindow::empty(self.chunk_size));
        }

        let last_byte = file_size - 1;
        let (from, to) = match requested {
            Some(range) => (range.from.unwrap_or(0), range.to.unwrap_or(last_byte)),
            None => (0, last_byte),
        };

        if to > file_size || to < from {
            debug!(
                "Unsatisfiable range {}-{} for file_size={}",
                from, to, file_size
            );
            return Err(GatewayError::RangeNotSatisfiable { file_size });
        }

        let to = to.min(last_byte);
        // `from == file_size` survives the check above and only fails once clamped
        if from > to {
            return Err(GatewayError::RangeNotSatisfiable { file_size });
        }

        let chunk_size = self.chunk_size;
        let offset = from - (from % chunk_size);
        let first_cut = from - offset;
        let last_cut = (to % chunk_size) + 1;
        let part_count = to / chunk_size - offset / chunk_size + 1;

        debug!(
            "Planned window {}-{} offset={} first_cut={} last_cut={} parts={} partial={}",
            from, to, offset, first_cut, last_cut, part_count, partial
        );

        Ok(RangeWindow {
            from_byte: from,
            to_byte: to,
            chunk_size,
            offset,
            first_cut,
            last_cut,
            part_count,
            partial,
            file_size,
        })
    }
}

/// Free-standing form of [`RangePlanner::plan`]
pub fn plan(range_header: Option<&str>, file_size: u64, chunk_size: u64) -> Result<RangeWindow> {
    RangePlanner::new(chunk_size).plan(range_header, file_size)
}
