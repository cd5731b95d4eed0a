//! In-memory backend session
//!
//! Serves content from a map keyed by remote id. Failures can be injected to
//! exercise resolution retry and mid-stream aborts.

use super::BackendSession;
use crate::error::{GatewayError, Result};
use crate::models::{FileLocation, FileRecord};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

const NO_FAILURE: u64 = u64::MAX;

/// Backend session holding file content in memory
pub struct MemorySession {
    name: String,
    contents: HashMap<String, Bytes>,
    unavailable: AtomicBool,
    fail_fetch_at: AtomicU64,
    locate_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MemorySession {
    pub fn new(name: impl Into<String>) -> Self {
        MemorySession {
            name: name.into(),
            contents: HashMap::new(),
            unavailable: AtomicBool::new(false),
            fail_fetch_at: AtomicU64::new(NO_FAILURE),
            locate_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Add content addressable by `remote_id`
    pub fn with_content(mut self, remote_id: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.contents.insert(remote_id.into(), data.into());
        self
    }

    /// Make every call fail with `BackendUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the fetch whose aligned offset equals `offset`
    pub fn fail_fetch_at(&self, offset: u64) {
        self.fail_fetch_at.store(offset, Ordering::SeqCst);
    }

    pub fn locate_calls(&self) -> usize {
        self.locate_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::backend(format!(
                "session {} is unavailable",
                self.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendSession for MemorySession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn locate(&self, record: &FileRecord) -> Result<FileLocation> {
        self.locate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        if !self.contents.contains_key(&record.remote_id) {
            return Err(GatewayError::NotFound(record.remote_id.clone()));
        }
        Ok(FileLocation::new(record.remote_id.clone()))
    }

    async fn fetch_chunk(
        &self,
        location: &FileLocation,
        offset: u64,
        chunk_size: u64,
    ) -> Result<Bytes> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        if self.fail_fetch_at.load(Ordering::SeqCst) == offset {
            return Err(GatewayError::backend(format!(
                "injected failure at offset {}",
                offset
            )));
        }

        let data = self
            .contents
            .get(location.as_str())
            .ok_or_else(|| GatewayError::NotFound(location.as_str().to_string()))?;

        let len = data.len() as u64;
        if offset >= len {
            return Ok(Bytes::new());
        }
        let end = (offset + chunk_size).min(len);
        Ok(data.slice(offset as usize..end as usize))
    }
}
