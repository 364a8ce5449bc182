// SMRT - a small HTTP service framework with strict content negotiation,
// uniform error mapping, request counters and a status endpoint.

// Re-export core functionality
pub use smrt_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use smrt_config;

#[cfg(feature = "http-client")]
pub use smrt_http_client;

// Re-export commonly used external crates
pub use serde;
pub use serde_json;
pub use tokio;

/// Everything a typical service needs in scope.
///
/// ```rust,no_run
/// use smrt::prelude::*;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let _guard = LogConfig::from_env().init()?;
///
///     let mut smrt = Smrt::new();
///     smrt.register(
///         EndpointDefinition::builder("/ping", |_req: HttpRequest| async {
///             Ok::<_, Error>(HttpResponse::ok().with_body(b"pong".to_vec()))
///         })
///         .method("GET")
///         .build()?,
///     )?;
///     Arc::new(smrt).listen(8080).await
/// }
/// ```
pub mod prelude {
    pub use smrt_core::logging::{LogConfig, LogFormat, LogLevel, LogOutput};
    pub use smrt_core::{
        ApplicationStatus, Bucket, CounterSnapshot, EndpointDefinition, Error, HttpMethod,
        HttpRequest, HttpResponse, Result, Smrt, SmrtApp, StatusReport,
    };

    #[cfg(feature = "config")]
    pub use smrt_config::{ApplicationConfig, ConfigManager, Validate};

    #[cfg(feature = "http-client")]
    pub use smrt_http_client::{HttpClient, HttpClientConfig, RequestOptions};
}
