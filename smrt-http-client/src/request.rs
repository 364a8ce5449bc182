//! Per-request options.

use crate::{HttpClientError, Result};
use serde::Serialize;
use smrt_core::HttpRequest;
use std::time::Duration;

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    /// Serialized on send, with `Content-Type: application/json` unless set
    Json(serde_json::Value),
}

/// Headers, timeout, body and correlation id for one outbound call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub body: Option<Body>,
    /// Sent as `X-Request-Id`; a fresh UUID is used when unset.
    pub request_id: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that carry the correlation id of the inbound request being
    /// served.
    pub fn forwarding(request: &HttpRequest) -> Self {
        Self {
            request_id: request.request_id().map(str::to_string),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Text(body.into()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value =
            serde_json::to_value(body).map_err(|e| HttpClientError::Json(e.to_string()))?;
        self.body = Some(Body::Json(value));
        Ok(self)
    }

    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub(crate) fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}
