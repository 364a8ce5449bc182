//! Request-to-endpoint negotiation.
//!
//! A naive router folds every mismatch into "not found". Here the checks
//! run in a fixed order and the first failing one decides:
//!
//! 1. path: no registered pattern matches → [`NegotiationOutcome::NoRoute`]
//! 2. method: not in the endpoint's allowed set → `MethodNotAllowed`
//! 3. `Content-Type` (POST/PUT/PATCH only, when the endpoint consumes a
//!    type): absent or different → `UnsupportedMediaType`
//! 4. `Accept` (when the endpoint produces a type): absent or not
//!    admitting it → `NotAcceptable`
//! 5. otherwise → `Dispatch`

use crate::content_negotiation::{MediaType, accept_satisfies, content_type_satisfies};
use crate::routing::{HttpMethod, RouteMatch, RouteRegistry};
use crate::{Error, Result};

/// Result of matching one request against the registry.
#[derive(Debug)]
pub enum NegotiationOutcome<'r> {
    Dispatch(RouteMatch<'r>),
    NoRoute,
    MethodNotAllowed(Vec<HttpMethod>),
    NotAcceptable(MediaType),
    UnsupportedMediaType(MediaType),
}

impl<'r> NegotiationOutcome<'r> {
    pub fn is_dispatch(&self) -> bool {
        matches!(self, NegotiationOutcome::Dispatch(_))
    }

    /// The matched route, or the error a failed negotiation is reported as.
    pub fn into_result(self, path: &str) -> Result<RouteMatch<'r>> {
        let err = match self {
            NegotiationOutcome::Dispatch(found) => return Ok(found),
            NegotiationOutcome::NoRoute => Error::RouteNotFound(path.to_string()),
            NegotiationOutcome::MethodNotAllowed(allowed) => Error::MethodNotAllowed(
                allowed
                    .iter()
                    .map(HttpMethod::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            NegotiationOutcome::NotAcceptable(produces) => {
                Error::NotAcceptable(produces.mime_type())
            }
            NegotiationOutcome::UnsupportedMediaType(consumes) => {
                Error::UnsupportedMediaType(consumes.mime_type())
            }
        };
        Err(err)
    }
}

/// Match `method path` with the given `Content-Type` and `Accept` headers.
///
/// `path` must already be stripped of its query string.
pub fn negotiate<'r>(
    registry: &'r RouteRegistry,
    method: &str,
    path: &str,
    content_type: Option<&str>,
    accept: Option<&str>,
) -> NegotiationOutcome<'r> {
    let Some(found) = registry.lookup(path) else {
        return NegotiationOutcome::NoRoute;
    };
    let endpoint = found.endpoint;

    let method = match HttpMethod::from_str(method) {
        Some(method) if endpoint.allows(method) => method,
        _ => return NegotiationOutcome::MethodNotAllowed(endpoint.methods().to_vec()),
    };

    if let Some(consumes) = endpoint.consumes()
        && method.carries_body()
        && !content_type_satisfies(content_type, consumes)
    {
        return NegotiationOutcome::UnsupportedMediaType(consumes.clone());
    }

    if let Some(produces) = endpoint.produces()
        && !accept_satisfies(accept, produces)
    {
        return NegotiationOutcome::NotAcceptable(produces.clone());
    }

    NegotiationOutcome::Dispatch(found)
}
