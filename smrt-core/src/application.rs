// Dispatcher and HTTP server

use crate::classifier::ErrorClassifier;
use crate::counters::{CounterSet, CounterSnapshot};
use crate::http::REQUEST_ID_HEADER;
use crate::negotiation::negotiate;
use crate::registration::{ApplicationBinding, SmrtApp};
use crate::routing::{EndpointDefinition, HttpMethod, RouteRegistry, split_target};
use crate::status_report::{STATUS_PATH, StatusEndpoint, StatusReport};
use crate::{Error, HttpRequest, HttpResponse, Result};
use futures_util::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::any::Any;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Path of the route installed by [`Smrt::enable_test_error_route`].
pub const ERROR_TEST_PATH: &str = "/test/error";

/// The framework instance: route registry, counters, application binding
/// and status endpoint behind one dispatch entry point.
///
/// Routes and the application are wired up before serving starts;
/// [`Smrt::register`] takes `&mut self` so registration cannot race with
/// dispatch.
///
/// ```
/// use smrt_core::{EndpointDefinition, HttpRequest, HttpResponse, Smrt};
///
/// # async fn example() -> smrt_core::Result<()> {
/// let mut smrt = Smrt::new();
/// smrt.register(
///     EndpointDefinition::builder("/ping", |_req: HttpRequest| async {
///         Ok::<_, smrt_core::Error>(HttpResponse::ok())
///     })
///     .build()?,
/// )?;
///
/// let response = smrt.handle(HttpRequest::new("GET", "/ping")).await;
/// assert_eq!(response.status, 200);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Smrt {
    registry: RouteRegistry,
    counters: Arc<CounterSet>,
    classifier: ErrorClassifier,
    binding: Arc<ApplicationBinding>,
    status: Arc<StatusEndpoint>,
}

impl Smrt {
    /// Create a framework instance with the status endpoint installed.
    pub fn new() -> Self {
        let counters = Arc::new(CounterSet::new());
        let binding = Arc::new(ApplicationBinding::new());
        let status = Arc::new(StatusEndpoint::new(counters.clone(), binding.clone()));

        let mut registry = RouteRegistry::new();
        status
            .definition()
            .and_then(|definition| registry.register(definition))
            .expect("static status endpoint declaration on an empty registry");

        Self {
            registry,
            classifier: ErrorClassifier::new(counters.clone()),
            counters,
            binding,
            status,
        }
    }

    /// Register an endpoint.
    ///
    /// Fails with `DuplicateRoute` when the normalized path is taken and with
    /// `InvalidRoute` for the reserved status path.
    pub fn register(&mut self, definition: EndpointDefinition) -> Result<()> {
        if definition.same_route(STATUS_PATH) {
            return Err(Error::InvalidRoute(format!(
                "{} is reserved for the status endpoint",
                definition.pattern()
            )));
        }
        self.registry.register(definition)
    }

    /// Bind the application reported by the status endpoint. Only one
    /// application can ever be bound.
    pub fn register_application(&self, app: Arc<dyn SmrtApp>) -> Result<()> {
        self.binding.bind(app)
    }

    /// Install `GET|PUT /test/error`, which always fails with a 500.
    pub fn enable_test_error_route(&mut self) -> Result<()> {
        self.register(
            EndpointDefinition::builder(ERROR_TEST_PATH, |_req: HttpRequest| async {
                Err::<HttpResponse, _>(Error::Internal("test error route triggered".to_string()))
            })
            .methods(["GET", "PUT"])
            .build()?,
        )
    }

    pub fn routes(&self) -> &RouteRegistry {
        &self.registry
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    pub fn application(&self) -> &ApplicationBinding {
        &self.binding
    }

    /// The status snapshot served on `GET /status`.
    pub fn status(&self) -> Result<StatusReport> {
        self.status.report()
    }

    /// Dispatch one request. Always produces a response and records it in
    /// the counters exactly once.
    pub async fn handle(&self, mut request: HttpRequest) -> HttpResponse {
        let started = Instant::now();

        let request_id = match request.request_id() {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                request
                    .headers
                    .insert(REQUEST_ID_HEADER.to_string(), id.clone());
                id
            }
        };

        let target = std::mem::take(&mut request.path);
        let (path, query) = split_target(&target);
        request.path = path.to_string();
        request.query_params.extend(query);

        let response = match self.dispatch(&mut request).await {
            Ok(response) => self.classifier.success(response),
            Err(err) => self.classifier.classify(&err, &request),
        };

        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            request_id = %request_id,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "request handled"
        );

        response.with_header(REQUEST_ID_HEADER, request_id)
    }

    async fn dispatch(&self, request: &mut HttpRequest) -> Result<HttpResponse> {
        let found = negotiate(
            &self.registry,
            &request.method,
            &request.path,
            request.content_type(),
            request.accept(),
        )
        .into_result(&request.path)?;

        let endpoint = found.endpoint;
        request.path_params = found.path_params;

        let carries_body = HttpMethod::from_str(&request.method).is_some_and(|m| m.carries_body());
        let json_body = endpoint.consumes().is_some_and(|m| m.is_json());
        if carries_body && (json_body || endpoint.validator().is_some()) {
            let body: serde_json::Value = serde_json::from_slice(&request.body)
                .map_err(|e| Error::Validation(format!("body is not valid JSON: {}", e)))?;
            if let Some(validator) = endpoint.validator() {
                validator(&body).map_err(Error::Validation)?;
            }
        }

        // Closures can panic before returning their future; call inside the guard.
        let handler = endpoint.handler();
        let call = AssertUnwindSafe(async { handler.call(request.clone()).await }).catch_unwind();
        match call.await {
            Ok(result) => result,
            Err(panic) => Err(Error::Internal(format!(
                "handler for {} panicked: {}",
                endpoint.pattern(),
                panic_message(panic.as_ref())
            ))),
        }
    }

    /// Bind `0.0.0.0:port` and serve until the listener fails.
    pub async fn listen(self: Arc<Self>, port: u16) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve HTTP/1.1 connections accepted from `listener`.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        info!(addr = %listener.local_addr()?, routes = self.registry.len(), "SMRT listening");

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let smrt = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let smrt = smrt.clone();
                    async move { handle_request(req, smrt).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(%peer, error = %err, "error serving connection");
                }
            });
        }
    }
}

impl Default for Smrt {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Convert a hyper request, dispatch it and convert the response back.
async fn handle_request(
    req: Request<IncomingBody>,
    smrt: Arc<Smrt>,
) -> std::result::Result<Response<Full<bytes::Bytes>>, hyper::Error> {
    let method = req.method().to_string();
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = HttpRequest::new(method, target);

    for (name, value) in req.headers() {
        if let Ok(value_str) = value.to_str() {
            request
                .headers
                .insert(name.to_string(), value_str.to_string());
        }
    }

    request.body = req.collect().await?.to_bytes().to_vec();

    let response = smrt.handle(request).await;
    Ok(into_hyper(response))
}

fn into_hyper(response: HttpResponse) -> Response<Full<bytes::Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (key, value) in &response.headers {
        builder = builder.header(key, value);
    }

    builder
        .body(Full::new(bytes::Bytes::from(response.body)))
        .unwrap_or_else(|e| {
            error!(error = %e, "failed to build response");
            let mut fallback = Response::new(Full::new(bytes::Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ErrorBody;
    use crate::registration::ApplicationStatus;

    struct App;

    impl SmrtApp for App {
        fn status(&self) -> ApplicationStatus {
            ApplicationStatus::new("X", "OK", "1.0.0")
        }

        fn application_name(&self) -> String {
            "X".to_string()
        }
    }

    async fn echo(req: HttpRequest) -> Result<HttpResponse> {
        HttpResponse::json(&serde_json::json!({
            "id": req.param("id"),
            "q": req.query("q"),
        }))
    }

    fn smrt() -> Smrt {
        let mut smrt = Smrt::new();
        smrt.register(
            EndpointDefinition::builder("/items/:id", echo)
                .methods(["GET", "PUT"])
                .consumes("application/json")
                .build()
                .unwrap(),
        )
        .unwrap();
        smrt
    }

    #[tokio::test]
    async fn test_dispatch_passes_params_and_query() {
        let smrt = smrt();
        let response = smrt.handle(HttpRequest::new("GET", "/items/7?q=x")).await;
        assert_eq!(response.status, 200);
        let body: serde_json::Value = response.body_json().unwrap();
        assert_eq!(body["id"], "7");
        assert_eq!(body["q"], "x");
        assert_eq!(smrt.counters().amount_successful, 1);
    }

    #[tokio::test]
    async fn test_request_id_generated_or_echoed() {
        let smrt = smrt();
        let response = smrt.handle(HttpRequest::new("GET", "/items/1")).await;
        let generated = response.header(REQUEST_ID_HEADER).unwrap();
        assert!(uuid::Uuid::parse_str(generated).is_ok());

        let response = smrt
            .handle(HttpRequest::new("GET", "/items/1").with_header("x-request-id", "abc"))
            .await;
        assert_eq!(response.header(REQUEST_ID_HEADER), Some("abc"));
    }

    #[tokio::test]
    async fn test_invalid_json_body_is_400() {
        let smrt = smrt();
        let response = smrt
            .handle(
                HttpRequest::new("PUT", "/items/1")
                    .with_header("Content-Type", "application/json")
                    .with_body("{not json"),
            )
            .await;
        assert_eq!(response.status, 400);
        assert_eq!(smrt.counters().amount_bad, 1);
    }

    #[tokio::test]
    async fn test_status_path_is_reserved() {
        let mut smrt = Smrt::new();
        let err = smrt
            .register(
                EndpointDefinition::builder("/status/", echo)
                    .build()
                    .unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRoute(_)));
        assert_eq!(smrt.routes().len(), 1);
    }

    #[tokio::test]
    async fn test_error_route() {
        let mut smrt = Smrt::new();
        smrt.enable_test_error_route().unwrap();

        for method in ["GET", "PUT"] {
            let response = smrt.handle(HttpRequest::new(method, ERROR_TEST_PATH)).await;
            assert_eq!(response.status, 500);
            let body: ErrorBody = response.body_json().unwrap();
            assert_eq!(body.description, "An unexpected error has occurred.");
        }
        assert_eq!(smrt.counters().amount_error, 2);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_500() {
        let mut smrt = Smrt::new();
        smrt.register(
            EndpointDefinition::builder("/boom", |_req: HttpRequest| async {
                if true {
                    panic!("kaboom");
                }
                Ok::<_, Error>(HttpResponse::ok())
            })
            .build()
            .unwrap(),
        )
        .unwrap();

        let response = smrt.handle(HttpRequest::new("GET", "/boom")).await;
        assert_eq!(response.status, 500);
        let snapshot = smrt.counters();
        assert_eq!(snapshot.amount_error, 1);
        assert!(snapshot.is_consistent());
    }

    #[tokio::test]
    async fn test_handler_panicking_before_its_future_is_500() {
        let mut smrt = Smrt::new();
        smrt.register(
            EndpointDefinition::builder("/items", |req: HttpRequest| {
                let n: u32 = req.query("n").unwrap().parse().unwrap();
                async move { HttpResponse::json(&serde_json::json!({ "n": n })) }
            })
            .build()
            .unwrap(),
        )
        .unwrap();

        let response = smrt.handle(HttpRequest::new("GET", "/items?n=3")).await;
        assert_eq!(response.status, 200);

        let response = smrt.handle(HttpRequest::new("GET", "/items")).await;
        assert_eq!(response.status, 500);
        let body: ErrorBody = response.body_json().unwrap();
        assert_eq!(body.description, "An unexpected error has occurred.");

        let snapshot = smrt.counters();
        assert_eq!(snapshot.amount_successful, 1);
        assert_eq!(snapshot.amount_error, 1);
        assert_eq!(snapshot.amount_total, 2);
    }

    #[test]
    fn test_status_endpoint_always_installed() {
        let smrt = Smrt::new();
        assert_eq!(smrt.routes().len(), 1);
        assert!(smrt.routes().contains(STATUS_PATH));
        let found = smrt.routes().lookup(STATUS_PATH).unwrap();
        assert!(found.endpoint.allows(HttpMethod::GET));
    }

    #[tokio::test]
    async fn test_status_before_and_after_binding() {
        let smrt = Smrt::new();
        let request = || HttpRequest::new("GET", STATUS_PATH).with_header("Accept", "*/*");

        assert_eq!(smrt.handle(request()).await.status, 500);

        smrt.register_application(Arc::new(App)).unwrap();
        let response = smrt.handle(request()).await;
        assert_eq!(response.status, 200);
        let report: StatusReport = response.body_json().unwrap();
        assert!(report.smrt.app_loaded);
        assert_eq!(report.status.amount_error, 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
