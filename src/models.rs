//! Core data models for the stream gateway

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};

/// Identifier taken from the request path: a capability hash followed by
/// the record key used by the metadata store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId {
    /// Capability hash prefix
    pub hash: String,
    /// Key of the file record
    pub key: String,
}

impl FileId {
    /// Split a path segment into hash and key
    ///
    /// The first `hash_length` characters are the hash. A segment that leaves
    /// no key behind is rejected as an invalid capability.
    pub fn parse(segment: &str, hash_length: usize) -> Result<Self> {
        let split = segment
            .char_indices()
            .nth(hash_length)
            .map(|(idx, _)| idx)
            .ok_or_else(|| GatewayError::InvalidCapability(segment.to_string()))?;

        let (hash, key) = segment.split_at(split);
        Ok(FileId {
            hash: hash.to_string(),
            key: key.to_string(),
        })
    }

}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.hash, self.key)
    }
}

/// Backend-opaque handle for a file's content
///
/// Only the session that produced it interprets the handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileLocation(String);

impl FileLocation {
    pub fn new(handle: impl Into<String>) -> Self {
        FileLocation(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// File record kept by the external metadata store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Record key
    pub id: String,
    /// Stable backend identifier; its prefix is the capability hash
    pub unique_id: String,
    /// Total size in bytes
    pub file_size: u64,
    /// MIME type as reported at upload time
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Display name
    #[serde(default)]
    pub file_name: Option<String>,
    /// Identifier the backend uses to address the content
    pub remote_id: String,
}

/// Resolved metadata for one request
///
/// Immutable once produced. The size is authoritative for the lifetime of
/// the response it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub id: String,
    pub size: u64,
    pub mime_type: Option<String>,
    pub display_name: String,
    pub location: FileLocation,
}

impl FileDescriptor {
    /// Build a descriptor from a store record and a session-issued location
    ///
    /// Records without a name get one derived from the unique id and the
    /// MIME subtype, e.g. `AgADBQ.mp4`.
    pub fn from_record(record: &FileRecord, location: FileLocation) -> Self {
        let display_name = match &record.file_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => fallback_name(record),
        };

        FileDescriptor {
            id: record.id.clone(),
            size: record.file_size,
            mime_type: record.mime_type.clone().filter(|m| !m.is_empty()),
            display_name,
            location,
        }
    }
}

fn fallback_name(record: &FileRecord) -> String {
    let ext = record
        .mime_type
        .as_deref()
        .and_then(|m| m.split('/').nth(1))
        .filter(|sub| !sub.is_empty())
        .unwrap_or("unknown");
    format!("{}.{}", record.unique_id, ext)
}

/// Represents an inclusive byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    /// Starting byte position (inclusive)
    pub start: u64,
    /// Ending byte position (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Create a new ByteRange, rejecting start > end
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(GatewayError::InternalError(format!(
                "range start ({}) must be <= end ({})",
                start, end
            )));
        }
        Ok(ByteRange { start, end })
    }

    /// Number of bytes covered
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Convert to an HTTP Range header value
    pub fn to_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Chunk-aligned plan for serving one request
///
/// Derived per request and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    /// First requested byte (inclusive)
    pub from_byte: u64,
    /// Last requested byte (inclusive), already clamped to the file
    pub to_byte: u64,
    /// Backend chunk size
    pub chunk_size: u64,
    /// Aligned offset of the first chunk fetch
    pub offset: u64,
    /// Bytes discarded from the front of the first chunk
    pub first_cut: u64,
    /// Bytes kept from the front of the last chunk
    pub last_cut: u64,
    /// Number of chunk fetches
    pub part_count: u64,
    /// Whether the client sent a syntactically valid Range header (206)
    pub partial: bool,
    /// Size of the file the window was planned against
    pub file_size: u64,
}

impl RangeWindow {
    /// Window for an empty file: nothing to fetch
    pub fn empty(chunk_size: u64) -> Self {
        RangeWindow {
            from_byte: 0,
            to_byte: 0,
            chunk_size,
            offset: 0,
            first_cut: 0,
            last_cut: 0,
            part_count: 0,
            partial: false,
            file_size: 0,
        }
    }

    /// Number of body bytes the response carries
    pub fn content_length(&self) -> u64 {
        if self.part_count == 0 {
            0
        } else {
            self.to_byte - self.from_byte + 1
        }
    }

    /// Value for the Content-Range header of a 206 response
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.from_byte, self.to_byte, self.file_size)
    }
}
