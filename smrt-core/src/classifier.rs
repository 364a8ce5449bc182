// Error classification: failures in, well-formed responses out

use crate::content_negotiation::Accept;
use crate::counters::{Bucket, CounterSet};
use crate::{Error, HttpRequest, HttpResponse, HttpStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Media type of every error body.
pub const ERROR_MEDIA_TYPE: &str = "application/se.novafaen.smrt.error.v1+json";

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub error: String,
    pub description: String,
}

/// Turns handler results and negotiation failures into responses and
/// records each one in the counters. Never fails.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    counters: Arc<CounterSet>,
}

impl ErrorClassifier {
    pub fn new(counters: Arc<CounterSet>) -> Self {
        Self { counters }
    }

    /// A handler completed normally.
    pub fn success(&self, response: HttpResponse) -> HttpResponse {
        let bucket = if response.warning {
            Bucket::Warning
        } else {
            Bucket::Successful
        };
        self.counters.record(bucket);
        response
    }

    /// Map a failure to its response and record it.
    pub fn classify(&self, err: &Error, request: &HttpRequest) -> HttpResponse {
        let status = err.http_status();
        let bucket = err.bucket();

        match err {
            Error::BadGateway(_) | Error::GatewayTimeout(_) => {
                warn!(path = %request.path, error = %err, "upstream failure");
            }
            _ if bucket == Bucket::Error => {
                error!(path = %request.path, error = %err, "unhandled failure");
            }
            _ => {
                debug!(path = %request.path, error = %err, "request rejected");
            }
        }

        self.counters.record(bucket);

        let body = ErrorBody {
            code: status.code(),
            error: status.reason().to_string(),
            description: describe(err, request),
        };

        let mut response = error_response(&body);
        if let Error::MethodNotAllowed(allowed) = err {
            response = response.with_header("Allow", allowed.clone());
        }
        response
    }
}

/// Caller-facing description. Server-side failures get a fixed text so
/// nothing internal leaks.
fn describe(err: &Error, request: &HttpRequest) -> String {
    match err {
        Error::RouteNotFound(_) | Error::MethodNotAllowed(_) => {
            format!("No method '{}' exist.", request.path)
        }
        Error::NotAcceptable(_) => match request.accept() {
            Some(accept) if !Accept::parse(accept).is_wildcard_only() => {
                format!("Accept type '{}' is not served by endpoint.", accept)
            }
            _ => "Missing Accept header.".to_string(),
        },
        Error::UnsupportedMediaType(_) => match request.content_type() {
            Some(content_type) => format!(
                "Content type '{}' cannot be handled by endpoint.",
                content_type
            ),
            None => "Missing Content-Type header.".to_string(),
        },
        Error::Validation(_) | Error::Deserialization(_) | Error::BadRequest(_) => {
            "Data does not conform to API specification.".to_string()
        }
        Error::NotFound(message) if message.is_empty() => "Resource does not exist.".to_string(),
        Error::NotFound(message) => message.clone(),
        Error::BadGateway(_) => "Received invalid response from proxy.".to_string(),
        Error::GatewayTimeout(_) => "Received no response from proxy.".to_string(),
        Error::NoApplicationBound => "No application has been registered.".to_string(),
        _ => "An unexpected error has occurred.".to_string(),
    }
}

fn error_response(body: &ErrorBody) -> HttpResponse {
    let response = HttpResponse::new(body.code).content_type(ERROR_MEDIA_TYPE);
    match serde_json::to_vec(body) {
        Ok(bytes) => response.with_body(bytes),
        Err(e) => {
            error!(error = %e, "failed to serialize error body");
            HttpResponse::new(HttpStatus::InternalServerError.code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> (ErrorClassifier, Arc<CounterSet>) {
        let counters = Arc::new(CounterSet::new());
        (ErrorClassifier::new(counters.clone()), counters)
    }

    fn body(response: &HttpResponse) -> ErrorBody {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn test_success_and_warning() {
        let (classifier, counters) = classifier();
        classifier.success(HttpResponse::ok());
        classifier.success(HttpResponse::new(409).with_warning());

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.amount_successful, 1);
        assert_eq!(snapshot.amount_warning, 1);
        assert_eq!(snapshot.amount_total, 2);
    }

    #[test]
    fn test_no_route_is_405_bad() {
        let (classifier, counters) = classifier();
        let request = HttpRequest::new("GET", "/nowhere");
        let response = classifier.classify(&Error::RouteNotFound("/nowhere".into()), &request);

        assert_eq!(response.status, 405);
        assert_eq!(response.header("Content-Type"), Some(ERROR_MEDIA_TYPE));
        let body = body(&response);
        assert_eq!(body.error, "Method Not Allowed");
        assert_eq!(body.description, "No method '/nowhere' exist.");
        assert_eq!(counters.snapshot().amount_bad, 1);
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let (classifier, _) = classifier();
        let request = HttpRequest::new("DELETE", "/items/1");
        let response =
            classifier.classify(&Error::MethodNotAllowed("GET, PUT".into()), &request);
        assert_eq!(response.status, 405);
        assert_eq!(response.header("Allow"), Some("GET, PUT"));
    }

    #[test]
    fn test_negotiation_descriptions() {
        let (classifier, counters) = classifier();

        let request = HttpRequest::new("GET", "/x").with_header("Accept", "text/html");
        let response = classifier.classify(&Error::NotAcceptable("a/b".into()), &request);
        assert_eq!(response.status, 406);
        assert_eq!(
            body(&response).description,
            "Accept type 'text/html' is not served by endpoint."
        );

        let request = HttpRequest::new("GET", "/x").with_header("Accept", "*/*");
        let response = classifier.classify(&Error::NotAcceptable("a/b".into()), &request);
        assert_eq!(body(&response).description, "Missing Accept header.");

        let request = HttpRequest::new("POST", "/x");
        let response = classifier.classify(&Error::UnsupportedMediaType("a/b".into()), &request);
        assert_eq!(response.status, 415);
        assert_eq!(body(&response).description, "Missing Content-Type header.");

        assert_eq!(counters.snapshot().amount_bad, 3);
    }

    #[test]
    fn test_server_failures_do_not_leak_details() {
        let (classifier, counters) = classifier();
        let request = HttpRequest::new("GET", "/x");

        let response = classifier.classify(
            &Error::Internal("db password is hunter2".into()),
            &request,
        );
        assert_eq!(response.status, 500);
        assert_eq!(body(&response).description, "An unexpected error has occurred.");

        let response = classifier.classify(&Error::BadGateway("stack trace".into()), &request);
        assert_eq!(response.status, 502);
        assert_eq!(
            body(&response).description,
            "Received invalid response from proxy."
        );

        let response = classifier.classify(&Error::GatewayTimeout("x".into()), &request);
        assert_eq!(response.status, 504);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.amount_error, 3);
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_validation_and_not_found() {
        let (classifier, counters) = classifier();
        let request = HttpRequest::new("POST", "/x");

        let response = classifier.classify(&Error::Validation("missing name".into()), &request);
        assert_eq!(response.status, 400);
        assert_eq!(
            body(&response).description,
            "Data does not conform to API specification."
        );

        let response = classifier.classify(&Error::NotFound("No user 7.".into()), &request);
        assert_eq!(response.status, 404);
        assert_eq!(body(&response).description, "No user 7.");

        assert_eq!(counters.snapshot().amount_bad, 2);
    }
}
