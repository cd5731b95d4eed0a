//! HTTP server
//!
//! Routes:
//! - `GET|HEAD /stream/<file_id>[/<filename>]` and the `/dl/...` alias
//! - `GET /status` server status as JSON
//! - `GET /metrics` Prometheus metrics

use crate::error::Result;
use crate::gateway::StreamGateway;
use crate::responder::{self, GatewayBody};
use http::header::{CONTENT_TYPE, RANGE};
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// HTTP front end for a [`StreamGateway`]
pub struct GatewayServer {
    gateway: Arc<StreamGateway>,
}

impl GatewayServer {
    pub fn new(gateway: Arc<StreamGateway>) -> Self {
        Self { gateway }
    }

    /// Bind `addr` and serve until the process is terminated
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("Stream gateway listening on http://{}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let gateway = Arc::clone(&self.gateway);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let gateway = Arc::clone(&gateway);
                    async move { Ok::<_, Infallible>(handle_request(&gateway, req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    // Clients abort media streams all the time when seeking.
                    debug!("Connection from {} ended: {}", peer_addr, err);
                }
            });
        }
    }
}

/// Extract the file id segment from `/stream/<id>[/<name>]` or `/dl/<id>[/<name>]`
pub fn stream_segment(path: &str) -> Option<&str> {
    let rest = path
        .strip_prefix("/stream/")
        .or_else(|| path.strip_prefix("/dl/"))?;
    let segment = rest.split('/').next()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(RANGE).and_then(|v| v.to_str().ok())
}

/// Route one request
pub async fn handle_request<B>(gateway: &StreamGateway, req: Request<B>) -> Response<GatewayBody> {
    let (parts, body) = req.into_parts();
    drop(body);
    let method = parts.method;
    let path = parts.uri.path().to_string();
    debug!("{} {}", method, path);

    let head_only = method == Method::HEAD;
    if method != Method::GET && !head_only {
        return responder::text_response(StatusCode::METHOD_NOT_ALLOWED, "405: Method not allowed");
    }

    if let Some(segment) = stream_segment(&path) {
        return gateway
            .serve(segment, range_header(&parts.headers), head_only)
            .await;
    }

    match path.as_str() {
        "/status" => json_response(gateway.status().to_string()),
        "/metrics" => match gateway.metrics().encode() {
            Ok(body) => {
                let mut headers = HeaderMap::new();
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
                );
                responder::build_response(StatusCode::OK, headers, responder::full_body(body))
            }
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                responder::text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "500: Internal server error",
                )
            }
        },
        _ => responder::text_response(StatusCode::NOT_FOUND, "404: Not found"),
    }
}

fn json_response(body: String) -> Response<GatewayBody> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    responder::build_response(StatusCode::OK, headers, responder::full_body(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_segment() {
        assert_eq!(stream_segment("/stream/AgADBQ65f0"), Some("AgADBQ65f0"));
        assert_eq!(stream_segment("/stream/AgADBQ65f0/movie.mkv"), Some("AgADBQ65f0"));
        assert_eq!(stream_segment("/dl/AgADBQ65f0"), Some("AgADBQ65f0"));
        assert_eq!(stream_segment("/stream/"), None);
        assert_eq!(stream_segment("/status"), None);
        assert_eq!(stream_segment("/streamer/x"), None);
    }
}
