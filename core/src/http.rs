//! HTTP wire types passed between the executor and its transport.
//!
//! # Design
//! Requests and responses are described as plain data. The executor builds an
//! `HttpRequest` without touching the network and hands it to whatever
//! `Transport` the client was given; the transport answers with an
//! `HttpResponse` whose body is still an unread stream. Headers are kept as an
//! ordered multimap (`Vec<(String, String)>`) so repeated keys survive intact.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::error::BoxError;

/// HTTP method for a request.
///
/// Well-known methods get their own variant; anything else is carried
/// verbatim in `Custom`. An empty `Custom` is the "method not set" state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Custom(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Custom(method) => method,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        Self::Custom(String::new())
    }
}

impl From<&str> for HttpMethod {
    fn from(method: &str) -> Self {
        match method {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for HttpMethod {
    fn from(method: String) -> Self {
        Self::from(method.as_str())
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Client::build_request`, optionally adjusted by the client's
/// `RequestDecorator`, then handed to the `Transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Append a header value, keeping any values already present for `name`.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Replace every value of `name` (case-insensitive) with `value`.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Unread response body.
///
/// Wraps a stream of byte chunks. Reading consumes it; dropping it without
/// reading closes the underlying connection handle, so every exit path of a
/// call releases the body.
pub struct ResponseBody {
    stream: BoxStream<'static, Result<Bytes, BoxError>>,
}

impl ResponseBody {
    pub fn from_stream(stream: BoxStream<'static, Result<Bytes, BoxError>>) -> Self {
        Self { stream }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::from_stream(stream::once(async move { Ok(bytes) }).boxed())
    }

    pub fn empty() -> Self {
        Self::from_stream(stream::empty().boxed())
    }

    /// Read the whole body into memory.
    pub async fn read_all(mut self) -> Result<Bytes, BoxError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Consume the body without keeping it.
    pub async fn drain(mut self) -> Result<(), BoxError> {
        while let Some(chunk) = self.stream.next().await {
            chunk?;
        }
        Ok(())
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}

/// An HTTP response as returned by a `Transport`, body still unread.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Split into the metadata returned to callers and the unread body.
    pub fn into_parts(self) -> (ResponseMeta, ResponseBody) {
        (
            ResponseMeta {
                status: self.status,
                headers: self.headers,
            },
            self.body,
        )
    }
}

/// Status line and headers of a response, kept after the body is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseMeta {
    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        self.status < 300
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_from_str_maps_known_names() {
        assert_eq!(HttpMethod::from("GET"), HttpMethod::Get);
        assert_eq!(HttpMethod::from("PATCH"), HttpMethod::Patch);
        assert_eq!(
            HttpMethod::from("PROPFIND"),
            HttpMethod::Custom("PROPFIND".to_string())
        );
    }

    #[test]
    fn empty_method_is_unset() {
        assert!(HttpMethod::from("").is_empty());
        assert!(HttpMethod::default().is_empty());
        assert!(!HttpMethod::Delete.is_empty());
    }

    #[test]
    fn add_header_keeps_existing_values() {
        let mut req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/".to_string(),
            headers: Vec::new(),
            body: None,
        };
        req.add_header("Accept", "text/plain");
        req.add_header("Accept", "application/json");
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.header("accept"), Some("text/plain"));
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/".to_string(),
            headers: vec![
                ("authorization".to_string(), "old".to_string()),
                ("X-Trace".to_string(), "1".to_string()),
            ],
            body: None,
        };
        req.set_header("Authorization", "token new");
        assert_eq!(
            req.headers,
            vec![
                ("X-Trace".to_string(), "1".to_string()),
                ("Authorization".to_string(), "token new".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn read_all_concatenates_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let body = ResponseBody::from_stream(stream::iter(chunks).boxed());
        assert_eq!(body.read_all().await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn read_all_surfaces_stream_errors() {
        let chunks: Vec<Result<Bytes, BoxError>> =
            vec![Ok(Bytes::from_static(b"ab")), Err("connection reset".into())];
        let body = ResponseBody::from_stream(stream::iter(chunks).boxed());
        let err = body.read_all().await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }
}
