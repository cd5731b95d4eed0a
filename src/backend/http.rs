//! Backend session speaking HTTP to an object-store API
//!
//! Locating a file issues `HEAD {base_url}/files/{remote_id}`, fetching a
//! chunk issues a `GET` with a `Range` header for the aligned window.

use super::BackendSession;
use crate::config::SessionConfig;
use crate::error::{GatewayError, Result};
use crate::models::{ByteRange, FileLocation, FileRecord};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP-backed session
pub struct HttpSession {
    name: String,
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpSession {
    /// Create a session from its configuration
    ///
    /// `timeout` bounds every request so a hung backend surfaces as
    /// `BackendUnavailable`.
    pub fn new(config: &SessionConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                GatewayError::ConfigError(format!(
                    "Failed to create HTTP client for session {}: {}",
                    config.name, e
                ))
            })?;

        Ok(HttpSession {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            client,
        })
    }

    fn file_url(&self, remote_id: &str) -> String {
        format!("{}/files/{}", self.base_url, remote_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Classify a non-success backend status
    fn status_error(&self, status: StatusCode, what: &str) -> GatewayError {
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            GatewayError::NotFound(what.to_string())
        } else if status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::UNAUTHORIZED
            || status.is_server_error()
        {
            GatewayError::backend(format!(
                "session {} got {} for {}",
                self.name, status, what
            ))
        } else {
            GatewayError::InternalError(format!(
                "session {} got unexpected {} for {}",
                self.name, status, what
            ))
        }
    }
}

#[async_trait]
impl BackendSession for HttpSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn locate(&self, record: &FileRecord) -> Result<FileLocation> {
        let url = self.file_url(&record.remote_id);
        debug!("Locating record={} via session={} url={}", record.id, self.name, url);

        let response = self
            .authorize(self.client.head(&url))
            .send()
            .await
            .map_err(|e| {
                warn!("HEAD request failed for url={}: {}", url, e);
                GatewayError::backend(format!("HEAD request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error(status, &record.remote_id));
        }

        Ok(FileLocation::new(record.remote_id.clone()))
    }

    async fn fetch_chunk(
        &self,
        location: &FileLocation,
        offset: u64,
        chunk_size: u64,
    ) -> Result<Bytes> {
        let url = self.file_url(location.as_str());
        let range = ByteRange::new(offset, offset + chunk_size - 1)?;

        let response = self
            .authorize(self.client.get(&url))
            .header("Range", range.to_header())
            .send()
            .await
            .map_err(|e| GatewayError::backend(format!("Chunk request failed: {}", e)))?;

        let status = response.status();
        match status {
            StatusCode::PARTIAL_CONTENT => response
                .bytes()
                .await
                .map_err(|e| GatewayError::backend(format!("Failed to read chunk body: {}", e))),
            StatusCode::OK => {
                // Backend ignored the Range header and sent the whole object.
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::backend(format!("Failed to read chunk body: {}", e)))?;
                let len = body.len() as u64;
                if offset >= len {
                    return Ok(Bytes::new());
                }
                let end = (offset + chunk_size).min(len);
                Ok(body.slice(offset as usize..end as usize))
            }
            StatusCode::RANGE_NOT_SATISFIABLE => Ok(Bytes::new()),
            other => Err(self.status_error(other, location.as_str())),
        }
    }
}
