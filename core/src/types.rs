//! Per-call parameters.
//!
//! # Design
//! `CallParams` is built fresh for every call. The request body is a closed
//! variant (text, bytes, or a value to JSON-encode) and the decode targets
//! are caller-owned `&mut` slots, so a single value can describe every shape
//! of call without type erasure. Builder methods that change a generic
//! parameter return a new `CallParams` with the other fields carried over.

use std::time::Duration;

use crate::http::HttpMethod;

/// Body sent with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody<B> {
    /// Sent byte-for-byte.
    Text(String),
    /// Sent byte-for-byte.
    Bytes(Vec<u8>),
    /// Encoded as JSON at call time.
    Json(B),
}

/// Description of one request.
///
/// `T` is the success decode target, `E` the error decode target. Both
/// default to `()` and are only touched when the matching slot is `Some`.
#[derive(Debug)]
pub struct CallParams<'a, B = (), T = (), E = ()> {
    pub method: HttpMethod,
    /// Appended verbatim to the client's endpoint.
    pub path: String,
    pub header: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub request_body: Option<RequestBody<B>>,
    pub response_body: Option<&'a mut T>,
    pub response_error_body: Option<&'a mut E>,
    /// Overrides the client's default timeout when set and non-zero.
    pub timeout: Option<Duration>,
}

impl CallParams<'static> {
    pub fn new(method: impl Into<HttpMethod>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            header: Vec::new(),
            query: Vec::new(),
            request_body: None,
            response_body: None,
            response_error_body: None,
            timeout: None,
        }
    }
}

impl Default for CallParams<'static> {
    fn default() -> Self {
        Self::new(HttpMethod::default(), "")
    }
}

impl<'a, B, T, E> CallParams<'a, B, T, E> {
    /// Add a header value; repeated names are all sent.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter; repeated names are all sent.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.request_body = Some(RequestBody::Bytes(body.into()));
        self
    }

    /// JSON-encode `body` when the call is made.
    pub fn json<B2>(self, body: B2) -> CallParams<'a, B2, T, E> {
        CallParams {
            method: self.method,
            path: self.path,
            header: self.header,
            query: self.query,
            request_body: Some(RequestBody::Json(body)),
            response_body: self.response_body,
            response_error_body: self.response_error_body,
            timeout: self.timeout,
        }
    }

    /// Decode a success (< 300) body into `target`.
    pub fn response_body<T2>(self, target: &'a mut T2) -> CallParams<'a, B, T2, E> {
        CallParams {
            method: self.method,
            path: self.path,
            header: self.header,
            query: self.query,
            request_body: self.request_body,
            response_body: Some(target),
            response_error_body: self.response_error_body,
            timeout: self.timeout,
        }
    }

    /// Decode an error (>= 300) body into `target`.
    pub fn response_error_body<E2>(self, target: &'a mut E2) -> CallParams<'a, B, T, E2> {
        CallParams {
            method: self.method,
            path: self.path,
            header: self.header,
            query: self.query,
            request_body: self.request_body,
            response_body: self.response_body,
            response_error_body: Some(target),
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_multimaps_in_order() {
        let params = CallParams::new("GET", "/groups")
            .header("Accept", "application/json")
            .header("Accept", "text/plain")
            .query("name", "foo")
            .query("name", "bar");
        assert_eq!(params.method, HttpMethod::Get);
        assert_eq!(params.header.len(), 2);
        assert_eq!(
            params.query,
            vec![
                ("name".to_string(), "foo".to_string()),
                ("name".to_string(), "bar".to_string()),
            ]
        );
    }

    #[test]
    fn json_keeps_previous_fields() {
        let mut out = serde_json::Value::Null;
        let params = CallParams::new("POST", "/users")
            .timeout(Duration::from_millis(500))
            .response_body(&mut out)
            .json(serde_json::json!({"name": "foo"}));
        assert_eq!(params.timeout, Some(Duration::from_millis(500)));
        assert!(params.response_body.is_some());
        assert!(matches!(params.request_body, Some(RequestBody::Json(_))));
    }

    #[test]
    fn default_has_no_method() {
        let params = CallParams::default();
        assert!(params.method.is_empty());
        assert!(params.path.is_empty());
        assert!(params.request_body.is_none());
    }
}
