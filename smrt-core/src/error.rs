// Error types for the SMRT dispatch layer

use crate::{Bucket, HttpStatus};
use thiserror::Error;

/// Every failure the dispatch layer knows how to classify.
///
/// Routing, negotiation, validation, upstream and unhandled failures sit
/// side by side; [`Error::status_code`] and [`Error::bucket`] map each one
/// to an HTTP status and a counter bucket.
#[derive(Error, Debug)]
pub enum Error {
    // Routing
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    // Negotiation
    #[error("Not Acceptable: {0}")]
    NotAcceptable(String),

    #[error("Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    // Validation
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    /// Application-level "resource does not exist".
    #[error("{0}")]
    NotFound(String),

    // Upstream
    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Gateway Timeout: {0}")]
    GatewayTimeout(String),

    // Unhandled
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Registration
    #[error("Route already registered: {0}")]
    DuplicateRoute(String),

    #[error("Invalid route definition: {0}")]
    InvalidRoute(String),

    #[error("An application is already registered: {0}")]
    AlreadyRegistered(String),

    #[error("No application has been registered")]
    NoApplicationBound,
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        match self {
            // Unknown paths are reported as 405, same as a method mismatch
            Error::RouteNotFound(_) | Error::MethodNotAllowed(_) => HttpStatus::MethodNotAllowed,
            Error::NotAcceptable(_) => HttpStatus::NotAcceptable,
            Error::UnsupportedMediaType(_) => HttpStatus::UnsupportedMediaType,
            Error::Validation(_) | Error::Deserialization(_) | Error::BadRequest(_) => {
                HttpStatus::BadRequest
            }
            Error::NotFound(_) => HttpStatus::NotFound,
            Error::BadGateway(_) => HttpStatus::BadGateway,
            Error::GatewayTimeout(_) => HttpStatus::GatewayTimeout,
            Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::DuplicateRoute(_)
            | Error::InvalidRoute(_)
            | Error::AlreadyRegistered(_)
            | Error::NoApplicationBound => HttpStatus::InternalServerError,
        }
    }

    /// The counter bucket a request failing with this error lands in.
    pub fn bucket(&self) -> Bucket {
        if self.http_status().is_client_error() {
            Bucket::Bad
        } else {
            Bucket::Error
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// Whether this error can only come out of startup wiring.
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Error::DuplicateRoute(_)
                | Error::InvalidRoute(_)
                | Error::AlreadyRegistered(_)
                | Error::NoApplicationBound
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_errors_map_to_405() {
        assert_eq!(Error::RouteNotFound("/x".into()).status_code(), 405);
        assert_eq!(Error::MethodNotAllowed("DELETE /x".into()).status_code(), 405);
    }

    #[test]
    fn test_negotiation_errors() {
        assert_eq!(Error::NotAcceptable("a".into()).status_code(), 406);
        assert_eq!(Error::UnsupportedMediaType("b".into()).status_code(), 415);
    }

    #[test]
    fn test_buckets() {
        assert_eq!(Error::Validation("x".into()).bucket(), Bucket::Bad);
        assert_eq!(Error::NotFound("x".into()).bucket(), Bucket::Bad);
        assert_eq!(Error::BadGateway("x".into()).bucket(), Bucket::Error);
        assert_eq!(Error::GatewayTimeout("x".into()).bucket(), Bucket::Error);
        assert_eq!(Error::Internal("x".into()).bucket(), Bucket::Error);
        assert_eq!(Error::NoApplicationBound.bucket(), Bucket::Error);
    }

    #[test]
    fn test_upstream_statuses() {
        assert_eq!(Error::BadGateway("x".into()).status_code(), 502);
        assert_eq!(Error::GatewayTimeout("x".into()).status_code(), 504);
        assert!(Error::GatewayTimeout("x".into()).is_server_error());
    }

    #[test]
    fn test_registration_errors() {
        assert!(Error::DuplicateRoute("/a".into()).is_registration_error());
        assert!(Error::NoApplicationBound.is_registration_error());
        assert!(!Error::Internal("boom".into()).is_registration_error());
        assert_eq!(Error::NoApplicationBound.status_code(), 500);
    }
}
