// Statuses the dispatch layer answers with on failure

/// Every status an [`Error`](crate::Error) can map to. Handlers are free to
/// answer with any other code through [`HttpResponse::new`](crate::HttpResponse::new).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpStatus {
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    UnsupportedMediaType = 415,
    InternalServerError = 500,
    BadGateway = 502,
    GatewayTimeout = 504,
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Reason phrase, used as the `error` field of error bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            HttpStatus::BadRequest => "Bad Request",
            HttpStatus::NotFound => "Not Found",
            HttpStatus::MethodNotAllowed => "Method Not Allowed",
            HttpStatus::NotAcceptable => "Not Acceptable",
            HttpStatus::UnsupportedMediaType => "Unsupported Media Type",
            HttpStatus::InternalServerError => "Internal Server Error",
            HttpStatus::BadGateway => "Bad Gateway",
            HttpStatus::GatewayTimeout => "Gateway Timeout",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.code() < 500
    }

    pub fn is_server_error(&self) -> bool {
        self.code() >= 500
    }
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> Self {
        status.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_reasons() {
        assert_eq!(HttpStatus::MethodNotAllowed.code(), 405);
        assert_eq!(u16::from(HttpStatus::BadGateway), 502);
        assert_eq!(
            HttpStatus::UnsupportedMediaType.reason(),
            "Unsupported Media Type"
        );
    }

    #[test]
    fn test_server_errors() {
        assert!(HttpStatus::GatewayTimeout.is_server_error());
        assert!(!HttpStatus::NotAcceptable.is_server_error());
        assert!(HttpStatus::NotAcceptable.is_client_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(HttpStatus::NotFound.to_string(), "404 Not Found");
    }
}
