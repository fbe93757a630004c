//! The call executor.
//!
//! # Design
//! `Client` holds the endpoint, a shared `Transport`, an optional
//! `RequestDecorator` and a default timeout. A call is split in two halves:
//! `build_request` assembles an `HttpRequest` without I/O (preconditions,
//! body encoding, URL, headers, decorator), and `call_with_cancel` dispatches
//! it and classifies the response. The effective deadline and the caller's
//! cancellation token guard both the dispatch and the body read; neither
//! outlives the call.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

use crate::error::{BoxError, CallError, Error, StatusCause, TransportError};
use crate::http::{HttpRequest, ResponseBody, ResponseMeta};
use crate::transport::{ReqwestTransport, RequestDecorator, Transport};
use crate::types::{CallParams, RequestBody};

/// Convenience layer over an HTTP transport with JSON bodies.
///
/// Fields are public so a client can be assembled or adjusted directly; the
/// `with_*` methods are shorthands for the same thing.
#[derive(Clone)]
pub struct Client {
    /// Base URL; every call's path is appended to it verbatim.
    pub endpoint: String,
    pub transport: Arc<dyn Transport>,
    pub decorator: Option<Arc<dyn RequestDecorator>>,
    /// Default deadline for calls that don't set their own.
    pub timeout: Option<Duration>,
}

impl Client {
    /// Client for `endpoint` using the default `ReqwestTransport`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport: Arc::new(ReqwestTransport::new()),
            decorator: None,
            timeout: None,
        }
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_decorator(mut self, decorator: impl RequestDecorator + 'static) -> Self {
        self.decorator = Some(Arc::new(decorator));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Assemble the request a call would send, without sending it.
    pub fn build_request<B, T, E>(&self, params: &CallParams<'_, B, T, E>) -> Result<HttpRequest, Error>
    where
        B: Serialize,
    {
        if self.endpoint.is_empty() {
            return Err(Error::MissingEndpoint);
        }
        if params.method.is_empty() {
            return Err(Error::MissingMethod);
        }
        if !is_token(params.method.as_str()) {
            return Err(Error::InvalidRequest(format!(
                "invalid method {:?}",
                params.method.as_str()
            )));
        }

        let (body, is_json) = match &params.request_body {
            None => (None, false),
            Some(RequestBody::Text(text)) => (Some(text.as_bytes().to_vec()), false),
            Some(RequestBody::Bytes(bytes)) => (Some(bytes.clone()), false),
            Some(RequestBody::Json(value)) => {
                (Some(serde_json::to_vec(value).map_err(Error::Encode)?), true)
            }
        };

        let url = build_url(&self.endpoint, &params.path, &params.query);
        if let Err(err) = Url::parse(&url) {
            return Err(Error::InvalidRequest(format!("invalid URL {url:?}: {err}")));
        }

        let mut request = HttpRequest {
            method: params.method.clone(),
            url,
            headers: Vec::with_capacity(params.header.len() + 1),
            body,
        };
        for (name, value) in &params.header {
            request.add_header(name.as_str(), value.as_str());
        }
        if is_json && request.header("content-type").is_none() {
            request.add_header("content-type", "application/json");
        }

        if let Some(decorator) = &self.decorator {
            if let Err(err) = decorator.decorate(&mut request) {
                warn!(method = %request.method, url = %request.url, error = %err, "request decorator failed");
                return Err(Error::Setup(err));
            }
        }
        Ok(request)
    }

    /// Perform one call with no caller-side cancellation.
    pub async fn call<B, T, E>(&self, params: CallParams<'_, B, T, E>) -> Result<ResponseMeta, Error>
    where
        B: Serialize,
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        self.call_with_cancel(&CancellationToken::new(), params).await
    }

    /// Perform one call, aborting when `cancel` fires or the deadline passes.
    ///
    /// On success the decode target (if any) is filled and the response
    /// metadata returned. Statuses >= 300 come back as `Error::Status`.
    pub async fn call_with_cancel<B, T, E>(
        &self,
        cancel: &CancellationToken,
        params: CallParams<'_, B, T, E>,
    ) -> Result<ResponseMeta, Error>
    where
        B: Serialize,
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        let request = self.build_request(&params)?;
        let deadline = self
            .effective_timeout(params.timeout)
            .map(|timeout| Deadline {
                at: Instant::now() + timeout,
                timeout,
            });

        debug!(method = %request.method, url = %request.url, timeout = ?deadline.map(|d| d.timeout), "sending request");
        let response = guard(self.transport.send(request), deadline, cancel)
            .await
            .map_err(Error::Send)?;
        let (meta, body) = response.into_parts();
        debug!(status = meta.status, "received response");

        if meta.status >= 300 {
            let err = classify_failure(meta, body, params.response_error_body, deadline, cancel).await;
            return Err(err.into());
        }

        match params.response_body {
            Some(target) => {
                let bytes = match guard(body.read_all(), deadline, cancel).await {
                    Ok(bytes) => bytes,
                    Err(source) => return Err(Error::Read { response: meta, source }),
                };
                match serde_json::from_slice::<T>(&bytes) {
                    Ok(decoded) => *target = decoded,
                    Err(source) => return Err(Error::Decode { response: meta, source }),
                }
            }
            None => {
                if let Err(err) = guard(body.drain(), deadline, cancel).await {
                    warn!(status = meta.status, error = %err, "ignoring error while draining response body");
                }
            }
        }
        Ok(meta)
    }

    fn effective_timeout(&self, call_timeout: Option<Duration>) -> Option<Duration> {
        call_timeout
            .filter(|t| !t.is_zero())
            .or_else(|| self.timeout.filter(|t| !t.is_zero()))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("transport", &self.transport)
            .field("decorator", &self.decorator.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

/// Run `fut` until it finishes, the deadline passes, or `cancel` fires.
/// Dropping `fut` on the losing branches releases whatever it owns.
async fn guard<F, R>(
    fut: F,
    deadline: Option<Deadline>,
    cancel: &CancellationToken,
) -> Result<R, TransportError>
where
    F: Future<Output = Result<R, BoxError>>,
{
    let expired = async {
        match deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline.at).await;
                deadline.timeout
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        res = fut => res.map_err(TransportError::Other),
        timeout = expired => Err(TransportError::Timeout(timeout)),
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
    }
}

async fn classify_failure<E>(
    response: ResponseMeta,
    body: ResponseBody,
    target: Option<&mut E>,
    deadline: Option<Deadline>,
    cancel: &CancellationToken,
) -> CallError
where
    E: DeserializeOwned,
{
    let bytes = match guard(body.read_all(), deadline, cancel).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return CallError {
                response,
                body_bytes: None,
                body: None,
                cause: StatusCause::Read(err),
            }
        }
    };

    let Some(target) = target else {
        return CallError {
            response,
            body_bytes: Some(bytes),
            body: None,
            cause: StatusCause::NonSuccess,
        };
    };

    let decoded = serde_json::from_slice::<serde_json::Value>(&bytes).and_then(|value| {
        let decoded = E::deserialize(&value)?;
        Ok((value, decoded))
    });
    match decoded {
        Ok((value, decoded)) => {
            *target = decoded;
            CallError {
                response,
                body_bytes: Some(bytes),
                body: Some(value),
                cause: StatusCause::NonSuccess,
            }
        }
        Err(err) => CallError {
            response,
            body_bytes: Some(bytes),
            body: None,
            cause: StatusCause::Parse(err),
        },
    }
}

/// RFC 9110 `token`: the characters allowed in a method name.
fn is_token(method: &str) -> bool {
    method
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

/// `endpoint + path`, plus the form-encoded query with keys sorted.
fn build_url(endpoint: &str, path: &str, query: &[(String, String)]) -> String {
    let mut url = format!("{endpoint}{path}");
    if query.is_empty() {
        return url;
    }
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    url.push('?');
    url.push_str(&encoded);
    url
}
