//! Pluggable collaborators: the transport that moves bytes and the hook that
//! decorates each request before it is sent.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. It must return every
//! response it receives as data, whatever the status, and must be safe to
//! share across concurrent calls. `ReqwestTransport` is the default; tests
//! swap in an in-memory implementation.

use std::fmt;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};

use crate::error::BoxError;
use crate::http::{HttpRequest, HttpResponse, ResponseBody};

/// Sends one request and returns the response with its body unread.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;
}

/// Mutates a fully assembled request before dispatch (auth, extra headers).
///
/// Runs after the call's own headers are applied, so it may override them.
/// An `Err` aborts the call before anything is sent.
pub trait RequestDecorator: Send + Sync {
    fn decorate(&self, request: &mut HttpRequest) -> Result<(), BoxError>;
}

impl<F> RequestDecorator for F
where
    F: Fn(&mut HttpRequest) -> Result<(), BoxError> + Send + Sync,
{
    fn decorate(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        self(request)
    }
}

/// Sets `Authorization: <scheme> <token>`.
#[derive(Clone)]
pub struct BearerToken {
    scheme: String,
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_scheme("Bearer", token)
    }

    pub fn with_scheme(scheme: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("scheme", &self.scheme)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl RequestDecorator for BearerToken {
    fn decorate(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        if self.token.is_empty() {
            return Err("authorization token is empty".into());
        }
        request.set_header("Authorization", format!("{} {}", self.scheme, self.token));
        Ok(())
    }
}

/// Sets a fixed list of headers on every request, replacing existing values.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: Vec<(String, String)>,
}

impl StaticHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl RequestDecorator for StaticHeaders {
    fn decorate(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        for (name, value) in &self.headers {
            request.set_header(name.as_str(), value.as_str());
        }
        Ok(())
    }
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reqwest(client: reqwest::Client) -> Self {
        Self { inner: client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())?;
        let mut builder = self.inner.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes_stream()
            .map_err(|e| Box::new(e) as BoxError)
            .boxed();

        Ok(HttpResponse {
            status,
            headers,
            body: ResponseBody::from_stream(body),
        })
    }
}
