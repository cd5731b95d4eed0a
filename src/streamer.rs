//! Per-session resolver/fetcher and its cache
//!
//! A [`SessionStreamer`] binds one backend session to the metadata store.
//! Streamers are created lazily, at most once per session, and live for the
//! rest of the process in a [`StreamerCache`] arena indexed by session.

use crate::backend::{BackendSession, MetadataStore, SessionPool};
use crate::error::{GatewayError, Result};
use crate::models::{FileDescriptor, FileLocation};
use bytes::Bytes;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Resolver and chunk fetcher bound to one session
pub struct SessionStreamer {
    index: usize,
    session: Arc<dyn BackendSession>,
    store: Arc<dyn MetadataStore>,
    call_timeout: Duration,
}

impl SessionStreamer {
    pub fn new(
        index: usize,
        session: Arc<dyn BackendSession>,
        store: Arc<dyn MetadataStore>,
        call_timeout: Duration,
    ) -> Self {
        SessionStreamer {
            index,
            session,
            store,
            call_timeout,
        }
    }

    /// Index of the bound session
    pub fn session_index(&self) -> usize {
        self.index
    }

    pub fn session_name(&self) -> &str {
        self.session.name()
    }

    /// Resolve a record key to a descriptor through this session
    ///
    /// `NotFound` comes from the store or the backend; any transport problem
    /// comes back as `BackendUnavailable`. No retry happens here.
    pub async fn resolve(&self, key: &str) -> Result<FileDescriptor> {
        let record = self.store.get_file(key).await?;
        let location = self
            .bounded(self.session.locate(&record), "locate")
            .await?;

        debug!(
            "Resolved key={} on session {} size={} mime={:?}",
            key, self.index, record.file_size, record.mime_type
        );
        Ok(FileDescriptor::from_record(&record, location))
    }

    /// Fetch one aligned chunk
    pub async fn fetch(
        &self,
        location: &FileLocation,
        offset: u64,
        chunk_size: u64,
    ) -> Result<Bytes> {
        self.bounded(self.session.fetch_chunk(location, offset, chunk_size), "fetch")
            .await
    }

    async fn bounded<T, F>(&self, call: F, what: &str) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::backend(format!(
                "{} on session {} timed out after {:?}",
                what, self.index, self.call_timeout
            ))),
        }
    }
}

/// Arena of lazily built streamers, one slot per session
pub struct StreamerCache {
    slots: Vec<OnceLock<Arc<SessionStreamer>>>,
    pool: SessionPool,
    store: Arc<dyn MetadataStore>,
    call_timeout: Duration,
}

impl StreamerCache {
    pub fn new(pool: SessionPool, store: Arc<dyn MetadataStore>, call_timeout: Duration) -> Self {
        StreamerCache {
            slots: (0..pool.len()).map(|_| OnceLock::new()).collect(),
            pool,
            store,
            call_timeout,
        }
    }

    /// Streamer for `index`, created on first use
    ///
    /// Returns `None` only for an index outside the pool.
    pub fn get(&self, index: usize) -> Option<Arc<SessionStreamer>> {
        let slot = self.slots.get(index)?;
        let session = self.pool.get(index)?;

        if let Some(existing) = slot.get() {
            debug!("Using cached streamer for session {}", index);
            return Some(Arc::clone(existing));
        }

        let streamer = slot.get_or_init(|| {
            debug!("Creating streamer for session {}", index);
            Arc::new(SessionStreamer::new(
                index,
                Arc::clone(session),
                Arc::clone(&self.store),
                self.call_timeout,
            ))
        });
        Some(Arc::clone(streamer))
    }

    /// Whether the streamer for `index` has been built
    pub fn is_cached(&self, index: usize) -> bool {
        self.slots.get(index).map_or(false, |slot| slot.get().is_some())
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }
}
