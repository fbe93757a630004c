//! Error types for the call executor.
//!
//! # Design
//! `Error` names the step that failed: configuration, request validation, body
//! encoding, request setup, transport, status classification or success-body
//! decoding. Only the `Status` variant carries a `CallError`, the structured
//! value callers are expected to inspect (status code, raw body, decoded
//! body). Every other variant keeps the original cause reachable through `source()`.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::http::ResponseMeta;

/// Error type produced by injected collaborators (transports, decorators).
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors returned by `Client::call`.
#[derive(Debug, Error)]
pub enum Error {
    /// The client has no endpoint configured.
    #[error("endpoint is required")]
    MissingEndpoint,

    /// The call has no method set.
    #[error("method is required")]
    MissingMethod,

    /// The method token or the assembled URL is malformed.
    #[error("failed to create a request: {0}")]
    InvalidRequest(String),

    /// The structured request body could not be serialized to JSON.
    #[error("failed to parse the request body as JSON: {0}")]
    Encode(#[source] serde_json::Error),

    /// The client's `RequestDecorator` rejected the request.
    #[error("failed to set a request: {0}")]
    Setup(#[source] BoxError),

    /// No response was received.
    #[error("failed to send a request: {0}")]
    Send(#[source] TransportError),

    /// The server answered with status >= 300.
    #[error(transparent)]
    Status(#[from] CallError),

    /// A success body could not be read.
    #[error("failed to read a response body: {source}")]
    Read {
        response: ResponseMeta,
        #[source]
        source: TransportError,
    },

    /// A success body was read but is not valid JSON for the target type.
    #[error("failed to read a response body as JSON: {source}")]
    Decode {
        response: ResponseMeta,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// The `CallError` for non-success statuses, if this is one.
    pub fn as_call_error(&self) -> Option<&CallError> {
        match self {
            Self::Status(err) => Some(err),
            _ => None,
        }
    }

    /// Response metadata, present whenever a response was received.
    pub fn response(&self) -> Option<&ResponseMeta> {
        match self {
            Self::Status(err) => Some(&err.response),
            Self::Read { response, .. } | Self::Decode { response, .. } => Some(response),
            _ => None,
        }
    }

    /// True if the call's deadline elapsed, at any step.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Send(err) | Self::Read { source: err, .. } => err.is_timeout(),
            Self::Status(err) => matches!(&err.cause, StatusCause::Read(e) if e.is_timeout()),
            _ => false,
        }
    }

    /// True if the caller's cancellation token fired, at any step.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Send(err) | Self::Read { source: err, .. } => err.is_cancelled(),
            Self::Status(err) => matches!(&err.cause, StatusCause::Read(e) if e.is_cancelled()),
            _ => false,
        }
    }
}

/// Failure while talking to the peer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("call cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(BoxError),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Why a non-success response became a `CallError`.
#[derive(Debug, Error)]
pub enum StatusCause {
    /// The body was read (and decoded, if a target was supplied).
    #[error("status code >= 300")]
    NonSuccess,

    #[error("status code >= 300: failed to read a response body: {0}")]
    Read(#[source] TransportError),

    #[error("status code >= 300: failed to parse an error response body as JSON: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Error for a response with status >= 300.
///
/// The raw body is attached whenever it could be read, whether or not it
/// decoded. `body()` holds the decoded error payload only when the caller
/// supplied an error target and decoding succeeded.
#[derive(Debug)]
pub struct CallError {
    pub(crate) response: ResponseMeta,
    pub(crate) body_bytes: Option<Bytes>,
    pub(crate) body: Option<serde_json::Value>,
    pub(crate) cause: StatusCause,
}

impl CallError {
    pub fn status_code(&self) -> u16 {
        self.response.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.response.headers
    }

    /// Raw response body, `None` if it could not be read.
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body_bytes.as_deref()
    }

    /// Decoded error body, if an error target was supplied and parsing succeeded.
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn cause(&self) -> &StatusCause {
        &self.cause
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.body_bytes.as_deref().unwrap_or_default();
        write!(
            f,
            "status code: {}, {}: {}",
            self.response.status,
            String::from_utf8_lossy(body),
            self.cause
        )
    }
}

impl StdError for CallError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

/// Errors from loading a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not set")]
    Missing { name: &'static str },

    #[error("{name} must be a number of milliseconds, got {value:?}")]
    InvalidTimeout { name: &'static str, value: String },
}
