//! Outbound call errors.

use thiserror::Error;

/// Result type for outbound calls.
pub type Result<T> = std::result::Result<T, HttpClientError>;

/// Outbound call errors.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// Only GET, POST, PUT and DELETE are supported.
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The upstream could not be reached or did not answer in time.
    #[error("Received no response from {url}: {message}")]
    GatewayTimeout {
        url: String,
        message: String,
    },

    /// The upstream answered with a 5xx.
    #[error("Upstream {url} responded {status}")]
    BadGateway {
        url: String,
        status: u16,
        /// Body of the upstream response
        body: String,
    },

    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HttpClientError {
    /// Whether the upstream never produced a response.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::GatewayTimeout { .. })
    }

    /// Status of the upstream response, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::BadGateway { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Upstream failures keep their gateway meaning; everything else is a local
/// programming or wiring error.
impl From<HttpClientError> for smrt_core::Error {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::GatewayTimeout { .. } => smrt_core::Error::GatewayTimeout(err.to_string()),
            HttpClientError::BadGateway { .. } => smrt_core::Error::BadGateway(err.to_string()),
            other => smrt_core::Error::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_mapping() {
        let timeout: smrt_core::Error = HttpClientError::GatewayTimeout {
            url: "http://x".into(),
            message: "connection refused".into(),
        }
        .into();
        assert_eq!(timeout.status_code(), 504);

        let gateway: smrt_core::Error = HttpClientError::BadGateway {
            url: "http://x".into(),
            status: 503,
            body: "down".into(),
        }
        .into();
        assert_eq!(gateway.status_code(), 502);

        let method: smrt_core::Error = HttpClientError::UnsupportedMethod("PATCH".into()).into();
        assert_eq!(method.status_code(), 500);

        let url: smrt_core::Error = HttpClientError::InvalidUrl("nope".into()).into();
        assert_eq!(url.status_code(), 500);
    }

    #[test]
    fn test_status_code() {
        let err = HttpClientError::BadGateway {
            url: "http://x".into(),
            status: 500,
            body: String::new(),
        };
        assert_eq!(err.status_code(), Some(500));
        assert!(!err.is_timeout());
        assert_eq!(HttpClientError::Json("x".into()).status_code(), None);
    }
}
