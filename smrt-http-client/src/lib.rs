//! # SMRT HTTP Client
//!
//! Outbound calls made by SMRT handlers. Upstream trouble comes back as
//! gateway errors that convert straight into `smrt_core::Error`, so a
//! handler can use `?` and get a 502 or 504 response.
//!
//! ```rust,no_run
//! use smrt_core::{HttpRequest, HttpResponse};
//! use smrt_http_client::{HttpClient, RequestOptions};
//!
//! async fn proxy(req: HttpRequest) -> smrt_core::Result<HttpResponse> {
//!     let client = HttpClient::with_defaults()?;
//!     let upstream = client
//!         .get("http://backend:8080/items", RequestOptions::forwarding(&req))
//!         .await?;
//!     Ok(HttpResponse::new(upstream.status().as_u16()).with_body(upstream.bytes().to_vec()))
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use client::HttpClient;
pub use config::{DEFAULT_TIMEOUT, HttpClientConfig, HttpClientConfigBuilder};
pub use error::{HttpClientError, Result};
pub use request::{Body, RequestOptions};
pub use response::Response;
