//! HTTP Responder
//!
//! Fixes status and headers for a planned window before any body byte is
//! sent, and renders error responses as short plain text.

use crate::chunk_stream::ChunkStream;
use crate::error::{GatewayError, Result};
use crate::models::{FileDescriptor, RangeWindow};
use bytes::Bytes;
use futures::StreamExt;
use http::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE,
};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

/// Body type of every gateway response
pub type GatewayBody = UnsyncBoxBody<Bytes, GatewayError>;

const OCTET_STREAM: &str = "application/octet-stream";

// RFC 5987 attr-char: everything else in `filename*` is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Content type for a descriptor: stored MIME, else a guess from the name
pub fn content_type(descriptor: &FileDescriptor) -> String {
    if let Some(mime) = &descriptor.mime_type {
        return mime.clone();
    }
    mime_guess::from_path(&descriptor.display_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Content-Disposition value for a file name
///
/// ASCII names produce `attachment; filename="<name>"`. Other names get an
/// ASCII fallback plus an RFC 5987 `filename*` parameter.
pub fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if name.is_ascii() && fallback == name {
        format!("attachment; filename=\"{}\"", name)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            utf8_percent_encode(name, ATTR_CHAR)
        )
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| GatewayError::InternalError(format!("Invalid header value '{}': {}", value, e)))
}

/// Build status and headers for a stream response
///
/// 206 with Content-Range when the client sent a valid Range header, 200
/// otherwise.
pub fn build_response_header(
    window: &RangeWindow,
    descriptor: &FileDescriptor,
) -> Result<(StatusCode, HeaderMap)> {
    let mut headers = HeaderMap::new();

    let status = if window.partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    headers.insert(CONTENT_TYPE, header_value(&content_type(descriptor))?);
    if window.partial {
        headers.insert(CONTENT_RANGE, header_value(&window.content_range())?);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(window.content_length()));
    headers.insert(
        CONTENT_DISPOSITION,
        header_value(&content_disposition(&descriptor.display_name))?,
    );
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    debug!(
        "Built response headers: status={}, content_length={}",
        status,
        window.content_length()
    );

    Ok((status, headers))
}

/// Wrap a chunk stream as a response body
pub fn stream_body(stream: ChunkStream) -> GatewayBody {
    StreamBody::new(stream.map(|item| item.map(Frame::data))).boxed_unsync()
}

pub fn full_body(data: impl Into<Bytes>) -> GatewayBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty_body() -> GatewayBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Assemble a response from precomputed parts
pub fn build_response(status: StatusCode, headers: HeaderMap, body: GatewayBody) -> Response<GatewayBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Plain-text response for a request that failed before streaming began
///
/// A 416 also carries `Content-Range: bytes */<size>`.
pub fn error_response(err: &GatewayError) -> Response<GatewayBody> {
    let status =
        StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    if let GatewayError::RangeNotSatisfiable { file_size } = err {
        if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", file_size)) {
            headers.insert(CONTENT_RANGE, value);
        }
    }

    build_response(status, headers, full_body(err.client_message()))
}

/// Plain-text response with an arbitrary status
pub fn text_response(status: StatusCode, text: &'static str) -> Response<GatewayBody> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    build_response(status, headers, full_body(text))
}
