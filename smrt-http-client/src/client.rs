//! Outbound HTTP calls with upstream failure mapping.

use crate::request::Body;
use crate::{HttpClientConfig, HttpClientError, RequestOptions, Response, Result};
use reqwest::Method;
use smrt_core::REQUEST_ID_HEADER;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Thin wrapper over `reqwest` that translates upstream trouble into
/// gateway errors:
///
/// - unreachable or timed out: [`HttpClientError::GatewayTimeout`] (504)
/// - answered with 5xx: [`HttpClientError::BadGateway`] (502)
/// - anything else is returned as is, 4xx included
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: Arc<HttpClientConfig>,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.make_request("GET", url, options).await
    }

    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.make_request("POST", url, options).await
    }

    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.make_request("PUT", url, options).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.make_request("DELETE", url, options).await
    }

    /// Perform one call. `method` is case-insensitive and must be GET, POST,
    /// PUT or DELETE.
    pub async fn make_request(
        &self,
        method: &str,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let method = parse_method(method)?;
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| HttpClientError::InvalidUrl(format!("{} {} ({})", method, url, e)))?;

        // Explicit option first, then a caller-supplied header.
        let request_id = options
            .request_id
            .clone()
            .or_else(|| {
                options
                    .headers
                    .iter()
                    .find(|(name, _)| is_request_id(name))
                    .map(|(_, value)| value.clone())
            })
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        debug!(request_id = %request_id, %method, url, "outbound request");

        let mut builder = self.inner.request(method.clone(), parsed);
        for (name, value) in &self.config.default_headers {
            if !options.has_header(name) && !is_request_id(name) {
                builder = builder.header(name, value);
            }
        }
        for (name, value) in options.headers.iter().filter(|(name, _)| !is_request_id(name)) {
            builder = builder.header(name, value);
        }
        builder = builder.header(REQUEST_ID_HEADER, &request_id);

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        match options.body {
            Some(Body::Text(text)) => builder = builder.body(text),
            Some(Body::Json(value)) => {
                if !options.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
                    builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                }
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| HttpClientError::Json(e.to_string()))?;
                builder = builder.body(bytes);
            }
            None => {}
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() || e.is_request() {
                warn!(request_id = %request_id, url, error = %e, "no response from upstream");
                HttpClientError::GatewayTimeout {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            } else {
                HttpClientError::Http(e)
            }
        })?;
        let response = Response::from_reqwest(response).await?;

        debug!(
            request_id = %request_id,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upstream responded"
        );

        if response.status().is_server_error() {
            warn!(
                request_id = %request_id,
                url,
                status = response.status().as_u16(),
                "upstream failed"
            );
            return Err(HttpClientError::BadGateway {
                url: url.to_string(),
                status: response.status().as_u16(),
                body: response.text(),
            });
        }

        Ok(response)
    }
}

fn is_request_id(name: &str) -> bool {
    name.eq_ignore_ascii_case(REQUEST_ID_HEADER)
}

fn parse_method(method: &str) -> Result<Method> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        other => Err(HttpClientError::UnsupportedMethod(other.to_string())),
    }
}
