//! Stream Gateway
//!
//! Exposes files held in a remote chat-based object store as plain HTTP
//! resources with byte-range support, so media can be seeked and downloads
//! resumed.
//!
//! # Overview
//!
//! Each request is answered by one backend session picked from a pool. The
//! gateway resolves the file identifier to metadata through that session,
//! aligns the requested byte range to the backend's fixed chunk size and
//! streams the chunks back, trimming the first and last one so the body is
//! byte-exact with the requested window.
//!
//! # Architecture
//!
//! - [`LoadTracker`]: in-flight stream count per session, least-loaded selection
//! - [`StreamerCache`]: one [`SessionStreamer`] (resolver + fetcher) per session
//! - [`RangePlanner`]: `Range` header parsing and chunk window geometry
//! - [`chunk_stream`](chunk_stream::chunk_stream): lazy, trimmed chunk sequence
//! - [`responder`]: status, headers and error bodies
//! - [`StreamGateway`]: orchestration, including resolution retry across sessions
//! - [`GatewayServer`]: hyper HTTP/1 front end
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stream_gateway::backend::http::HttpSession;
//! use stream_gateway::backend::{BackendSession, SessionPool};
//! use stream_gateway::{FileCatalog, GatewayConfig, GatewayServer, StreamGateway};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(GatewayConfig::from_file("stream_gateway.yaml")?);
//! let sessions = config
//!     .sessions
//!     .iter()
//!     .map(|s| HttpSession::new(s, config.fetch_timeout()).map(|s| Arc::new(s) as Arc<dyn BackendSession>))
//!     .collect::<Result<Vec<_>, _>>()?;
//! let catalog = Arc::new(FileCatalog::from_file(&config.catalog_path)?);
//!
//! let gateway = StreamGateway::new(config.clone(), SessionPool::new(sessions)?, catalog.clone(), catalog)?;
//! GatewayServer::new(Arc::new(gateway)).run(config.socket_addr()?).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod catalog;
pub mod chunk_stream;
pub mod config;
pub mod error;
pub mod gateway;
pub mod load_tracker;
pub mod metrics;
pub mod models;
pub mod range_planner;
pub mod responder;
pub mod server;
pub mod streamer;

// Re-export commonly used types
pub use catalog::FileCatalog;
pub use config::{GatewayConfig, SessionConfig};
pub use error::{GatewayError, Result};
pub use gateway::StreamGateway;
pub use load_tracker::{LoadGuard, LoadTracker};
pub use metrics::GatewayMetrics;
pub use models::{ByteRange, FileDescriptor, FileId, FileLocation, FileRecord, RangeWindow};
pub use range_planner::RangePlanner;
pub use server::GatewayServer;
pub use streamer::{SessionStreamer, StreamerCache};
