//! Configuration management for the stream gateway

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Configuration for the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address the HTTP server listens on (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Backend chunk size in bytes (default: 1MB)
    /// Valid range: 4KB to 16MB, multiple of 4KB
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// How many sessions to try when resolution hits a backend failure (default: 3)
    #[serde(default = "default_max_resolve_attempts")]
    pub max_resolve_attempts: usize,

    /// Timeout for a single backend call in seconds (default: 30)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Length of the capability hash prefix in file identifiers (default: 6)
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,

    /// Path to the YAML file catalog
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Public URL reported by the status endpoint (optional)
    #[serde(default)]
    pub public_url: Option<String>,

    /// Backend sessions, one per authenticated connection
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

/// Configuration for one backend session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Human readable name used in logs
    pub name: String,

    /// Base URL of the backend object API
    pub base_url: String,

    /// Bearer token for this session (optional)
    #[serde(default)]
    pub token: Option<String>,
}

// Default value functions for serde
fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_chunk_size() -> u64 {
    1024 * 1024 // 1MB
}

fn default_max_resolve_attempts() -> usize {
    3
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_hash_length() -> usize {
    6
}

fn default_catalog_path() -> String {
    "catalog.yaml".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            bind_address: default_bind_address(),
            chunk_size: default_chunk_size(),
            max_resolve_attempts: default_max_resolve_attempts(),
            fetch_timeout_secs: default_fetch_timeout(),
            hash_length: default_hash_length(),
            catalog_path: default_catalog_path(),
            public_url: None,
            sessions: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            GatewayError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: GatewayConfig = serde_yaml::from_str(&content).map_err(|e| {
            GatewayError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - bind_address must parse as a socket address
    /// - chunk_size must be between 4KB and 16MB and a multiple of 4KB
    /// - max_resolve_attempts and fetch_timeout_secs must be > 0
    /// - hash_length must be between 1 and 64
    /// - at least one session must be configured
    pub fn validate(&self) -> Result<()> {
        const MIN_CHUNK_SIZE: u64 = 4 * 1024; // 4KB
        const MAX_CHUNK_SIZE: u64 = 16 * 1024 * 1024; // 16MB

        self.socket_addr()?;

        if self.chunk_size < MIN_CHUNK_SIZE || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(GatewayError::ConfigError(format!(
                "chunk_size must be between {}KB and {}MB, got {} bytes",
                MIN_CHUNK_SIZE / 1024,
                MAX_CHUNK_SIZE / (1024 * 1024),
                self.chunk_size
            )));
        }

        if self.chunk_size % MIN_CHUNK_SIZE != 0 {
            return Err(GatewayError::ConfigError(format!(
                "chunk_size must be a multiple of {}, got {}",
                MIN_CHUNK_SIZE, self.chunk_size
            )));
        }

        if self.max_resolve_attempts == 0 {
            return Err(GatewayError::ConfigError(
                "max_resolve_attempts must be greater than 0".to_string(),
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(GatewayError::ConfigError(
                "fetch_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.hash_length == 0 || self.hash_length > 64 {
            return Err(GatewayError::ConfigError(format!(
                "hash_length must be between 1 and 64, got {}",
                self.hash_length
            )));
        }

        if self.catalog_path.is_empty() {
            return Err(GatewayError::ConfigError(
                "catalog_path must not be empty".to_string(),
            ));
        }

        if self.sessions.is_empty() {
            return Err(GatewayError::ConfigError(
                "at least one backend session must be configured".to_string(),
            ));
        }

        for session in &self.sessions {
            if session.base_url.is_empty() {
                return Err(GatewayError::ConfigError(format!(
                    "session '{}' has an empty base_url",
                    session.name
                )));
            }
        }

        Ok(())
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            GatewayError::ConfigError(format!(
                "Invalid bind_address '{}': {}",
                self.bind_address, e
            ))
        })
    }

    /// Per-call backend timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
