//! Backend collaborators
//!
//! The gateway never talks to the chat backend directly. It goes through
//! three capabilities:
//!
//! - [`BackendSession`]: one authenticated connection able to locate a file's
//!   content and fetch aligned chunks of it
//! - [`MetadataStore`]: the document store holding file records
//! - [`CapabilityValidator`]: checks the hash embedded in a file identifier
//!
//! Sessions are grouped in a [`SessionPool`] and addressed by a stable index.

pub mod http;
pub mod memory;

use crate::error::{GatewayError, Result};
use crate::models::{FileId, FileLocation, FileRecord};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// One authenticated connection to the backend store
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Name used in logs and status output
    fn name(&self) -> &str;

    /// Turn a store record into a location handle valid for this session
    ///
    /// Fails with `NotFound` when the backend no longer has the content and
    /// with `BackendUnavailable` on network errors, rate limits or an
    /// expired session.
    async fn locate(&self, record: &FileRecord) -> Result<FileLocation>;

    /// Fetch up to `chunk_size` bytes starting at the aligned `offset`
    ///
    /// Returns fewer bytes at the end of the content and an empty buffer past it.
    async fn fetch_chunk(
        &self,
        location: &FileLocation,
        offset: u64,
        chunk_size: u64,
    ) -> Result<Bytes>;
}

/// Store of file records keyed by record id
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Look up a record, failing with `NotFound` for unknown keys
    async fn get_file(&self, key: &str) -> Result<FileRecord>;
}

/// Validator for the capability hash in a file identifier
#[async_trait]
pub trait CapabilityValidator: Send + Sync {
    async fn validate(&self, file_id: &FileId) -> bool;
}

/// Fixed set of backend sessions created at startup
#[derive(Clone)]
pub struct SessionPool {
    sessions: Vec<Arc<dyn BackendSession>>,
}

impl SessionPool {
    /// Create a pool; an empty pool is a configuration error
    pub fn new(sessions: Vec<Arc<dyn BackendSession>>) -> Result<Self> {
        if sessions.is_empty() {
            return Err(GatewayError::ConfigError(
                "backend session pool is empty".to_string(),
            ));
        }
        Ok(SessionPool { sessions })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Session at a stable index
    pub fn get(&self, index: usize) -> Option<&Arc<dyn BackendSession>> {
        self.sessions.get(index)
    }
}
