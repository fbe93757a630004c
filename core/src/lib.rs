//! Generic HTTP call helper with JSON bodies and structured errors.
//!
//! # Overview
//! A `Client` joins its endpoint with a call's path, encodes the request body
//! (text, bytes, or any `Serialize` value as JSON), sends it through an
//! injected `Transport`, and decodes the response into caller-owned targets.
//! Responses with status >= 300 become a `CallError` carrying the status
//! code, the raw body and, when requested, the decoded error payload.
//!
//! # Design
//! - Exactly one network attempt per call: no retries, no pooling policy.
//! - `Client::build_request` is pure, so request assembly is testable
//!   without a transport.
//! - Deadlines come from the call or the client's default; a
//!   `CancellationToken` lets callers abort from outside.
//! - Wire types are plain data (`String` / `Vec`) so transports stay small.
//!
//! ```no_run
//! # async fn demo() -> Result<(), httpcall::Error> {
//! use httpcall::{BearerToken, CallParams, Client};
//!
//! let client = Client::new("http://example.com/api")
//!     .with_decorator(BearerToken::with_scheme("token", "xxx"));
//! let mut created = serde_json::Value::Null;
//! client
//!     .call(
//!         CallParams::new("POST", "/users")
//!             .json(serde_json::json!({"name": "foo", "email": "foo@example.com"}))
//!             .response_body(&mut created),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{BoxError, CallError, ConfigError, Error, StatusCause, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody, ResponseMeta};
pub use tokio_util::sync::CancellationToken;
pub use transport::{BearerToken, ReqwestTransport, RequestDecorator, StaticHeaders, Transport};
pub use types::{CallParams, RequestBody};
