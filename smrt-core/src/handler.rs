// Endpoint handlers
//
// Handlers are async functions from `HttpRequest` to `Result<HttpResponse, Error>`.
// They keep their concrete type until registration, where `BoxedHandler`
// erases it so endpoints with different handlers fit in one registry.

use crate::{Error, HttpRequest, HttpResponse};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The boxed future every stored handler returns.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// A handler that can process HTTP requests.
pub trait Handler: Clone + Send + Sync + 'static {
    /// The future returned by `call`.
    type Future: Future<Output = Result<HttpResponse, Error>> + Send + 'static;

    /// Handle an HTTP request.
    fn call(&self, req: HttpRequest) -> Self::Future;
}

/// Trait for converting various function types into handlers.
pub trait IntoHandler<Args>: Clone + Send + Sync + 'static {
    /// The handler type this converts into.
    type Handler: Handler;

    /// Convert into a handler.
    fn into_handler(self) -> Self::Handler;
}

/// A function handler that wraps an async function.
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    /// Create a new function handler.
    #[inline]
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(HttpRequest) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    type Future = Fut;

    #[inline]
    fn call(&self, req: HttpRequest) -> Self::Future {
        (self.f)(req)
    }
}

impl<F, Fut> IntoHandler<(HttpRequest,)> for F
where
    F: Fn(HttpRequest) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    type Handler = FnHandler<F>;

    #[inline]
    fn into_handler(self) -> Self::Handler {
        FnHandler::new(self)
    }
}

/// Type-erased handler stored on an endpoint definition.
pub struct BoxedHandler {
    inner: Arc<dyn ErasedHandler>,
}

impl BoxedHandler {
    /// Create a new boxed handler from any Handler.
    pub fn new<H: Handler>(handler: H) -> Self {
        Self {
            inner: Arc::new(HandlerWrapper { handler }),
        }
    }

    /// Call the handler.
    #[inline]
    pub fn call(&self, req: HttpRequest) -> HandlerFuture {
        self.inner.call(req)
    }
}

impl Clone for BoxedHandler {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedHandler").finish_non_exhaustive()
    }
}

trait ErasedHandler: Send + Sync {
    fn call(&self, req: HttpRequest) -> HandlerFuture;
}

struct HandlerWrapper<H: Handler> {
    handler: H,
}

impl<H: Handler> ErasedHandler for HandlerWrapper<H> {
    #[inline]
    fn call(&self, req: HttpRequest) -> HandlerFuture {
        Box::pin(self.handler.call(req))
    }
}

/// Create a boxed handler from a function.
///
/// ```
/// use smrt_core::{handler::handler, Error, HttpRequest, HttpResponse};
///
/// async fn hello(_req: HttpRequest) -> Result<HttpResponse, Error> {
///     Ok(HttpResponse::ok())
/// }
///
/// let h = handler(hello);
/// ```
#[inline]
pub fn handler<H, Args>(h: H) -> BoxedHandler
where
    H: IntoHandler<Args>,
{
    BoxedHandler::new(h.into_handler())
}
