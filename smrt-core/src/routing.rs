// Route registry: endpoint definitions and path matching

use crate::content_negotiation::MediaType;
use crate::handler::{BoxedHandler, IntoHandler, handler};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// HTTP methods an endpoint can allow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    /// Methods whose requests carry a body subject to `consumes`.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::POST | HttpMethod::PUT | HttpMethod::PATCH)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-supplied check run against a parsed JSON body.
pub type BodyValidator = Arc<dyn Fn(&serde_json::Value) -> std::result::Result<(), String> + Send + Sync>;

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

/// A registered endpoint: path pattern, allowed methods, media types and handler.
///
/// Built once through [`EndpointDefinition::builder`] and never mutated after
/// it is handed to the [`RouteRegistry`].
#[derive(Clone)]
pub struct EndpointDefinition {
    pattern: String,
    segments: Vec<Segment>,
    methods: Vec<HttpMethod>,
    consumes: Option<MediaType>,
    produces: Option<MediaType>,
    validator: Option<BodyValidator>,
    handler: BoxedHandler,
}

impl EndpointDefinition {
    /// Start declaring an endpoint at `path` served by `h`.
    pub fn builder<H, Args>(path: impl Into<String>, h: H) -> EndpointBuilder
    where
        H: IntoHandler<Args>,
    {
        EndpointBuilder {
            path: path.into(),
            methods: Vec::new(),
            consumes: None,
            produces: None,
            validator: None,
            handler: handler(h),
        }
    }

    /// The pattern as declared (e.g. `/users/:id`)
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Allowed methods in declaration order
    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }

    pub fn allows(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }

    pub fn consumes(&self) -> Option<&MediaType> {
        self.consumes.as_ref()
    }

    pub fn produces(&self) -> Option<&MediaType> {
        self.produces.as_ref()
    }

    pub fn validator(&self) -> Option<&BodyValidator> {
        self.validator.as_ref()
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    /// Whether `pattern` normalizes to the same route as this definition.
    pub fn same_route(&self, pattern: &str) -> bool {
        parse_pattern(pattern)
            .map(|segments| normalized_key(&segments) == normalized_key(&self.segments))
            .unwrap_or(false)
    }

    fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if self.segments.len() != path_parts.len() {
            return None;
        }

        let mut params = HashMap::new();

        for (segment, part) in self.segments.iter().zip(path_parts.iter()) {
            match segment {
                Segment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
                Segment::Static(s) if s == part => {}
                Segment::Static(_) => return None,
            }
        }

        Some(params)
    }
}

impl fmt::Debug for EndpointDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDefinition")
            .field("pattern", &self.pattern)
            .field("methods", &self.methods)
            .field("consumes", &self.consumes.as_ref().map(|m| m.mime_type()))
            .field("produces", &self.produces.as_ref().map(|m| m.mime_type()))
            .finish()
    }
}

/// Collects the route declaration before it is validated.
pub struct EndpointBuilder {
    path: String,
    methods: Vec<String>,
    consumes: Option<String>,
    produces: Option<String>,
    validator: Option<BodyValidator>,
    handler: BoxedHandler,
}

impl EndpointBuilder {
    /// Allow one more method
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }

    /// Allow several methods
    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }

    /// Required `Content-Type` for body-bearing requests
    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes = Some(media_type.into());
        self
    }

    /// Media type the endpoint responds with; clients must accept it
    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces = Some(media_type.into());
        self
    }

    /// Reject bodies failing `check` with 400 before the handler runs
    pub fn validate_body<F>(mut self, check: F) -> Self
    where
        F: Fn(&serde_json::Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(check));
        self
    }

    /// Validate the declaration. Without any method the endpoint allows `GET`.
    pub fn build(self) -> Result<EndpointDefinition> {
        let segments = parse_pattern(&self.path)?;

        let mut methods = Vec::new();
        for raw in &self.methods {
            let method = HttpMethod::from_str(raw.trim()).ok_or_else(|| {
                Error::InvalidRoute(format!("{}: unknown method '{}'", self.path, raw))
            })?;
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        if methods.is_empty() {
            methods.push(HttpMethod::GET);
        }

        let consumes = parse_media_type(&self.path, "consumes", self.consumes.as_deref())?;
        let produces = parse_media_type(&self.path, "produces", self.produces.as_deref())?;

        Ok(EndpointDefinition {
            pattern: self.path,
            segments,
            methods,
            consumes,
            produces,
            validator: self.validator,
            handler: self.handler,
        })
    }
}

fn parse_media_type(path: &str, field: &str, raw: Option<&str>) -> Result<Option<MediaType>> {
    raw.map(|value| {
        MediaType::parse(value).ok_or_else(|| {
            Error::InvalidRoute(format!("{}: invalid {} media type '{}'", path, field, value))
        })
    })
    .transpose()
}

/// Split a pattern into segments. Placeholders may be written `:name`,
/// `{name}` or `<name>` / `<converter:name>`.
fn parse_pattern(pattern: &str) -> Result<Vec<Segment>> {
    if !pattern.starts_with('/') {
        return Err(Error::InvalidRoute(format!(
            "{}: path must start with '/'",
            pattern
        )));
    }

    let mut segments = Vec::new();
    for part in pattern.split('/').filter(|s| !s.is_empty()) {
        let param = part
            .strip_prefix(':')
            .or_else(|| part.strip_prefix('{').and_then(|p| p.strip_suffix('}')))
            .or_else(|| {
                part.strip_prefix('<')
                    .and_then(|p| p.strip_suffix('>'))
                    .map(|p| p.rsplit(':').next().unwrap_or(p))
            });

        match param {
            Some("") => {
                return Err(Error::InvalidRoute(format!(
                    "{}: empty path parameter name",
                    pattern
                )));
            }
            Some(name) => {
                if segments
                    .iter()
                    .any(|s| matches!(s, Segment::Param(existing) if existing == name))
                {
                    return Err(Error::InvalidRoute(format!(
                        "{}: duplicate path parameter '{}'",
                        pattern, name
                    )));
                }
                segments.push(Segment::Param(name.to_string()));
            }
            None => segments.push(Segment::Static(part.to_string())),
        }
    }

    Ok(segments)
}

/// Parameter names are erased so `/users/:id` and `/users/{uid}` collide.
fn normalized_key(segments: &[Segment]) -> String {
    let mut key = String::new();
    for segment in segments {
        key.push('/');
        match segment {
            Segment::Static(s) => key.push_str(s),
            Segment::Param(_) => key.push(':'),
        }
    }
    if key.is_empty() {
        key.push('/');
    }
    key
}

/// A successful path lookup.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    pub endpoint: &'r EndpointDefinition,
    pub path_params: HashMap<String, String>,
}

/// Ordered collection of endpoint definitions, one per normalized path.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    endpoints: Vec<EndpointDefinition>,
    index: HashMap<String, usize>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an endpoint. Fails if its normalized path is already taken.
    pub fn register(&mut self, definition: EndpointDefinition) -> Result<()> {
        let key = normalized_key(&definition.segments);
        if let Some(&existing) = self.index.get(&key) {
            return Err(Error::DuplicateRoute(format!(
                "{} conflicts with {}",
                definition.pattern, self.endpoints[existing].pattern
            )));
        }

        tracing::debug!(
            pattern = %definition.pattern,
            methods = ?definition.methods,
            "registered endpoint"
        );
        self.index.insert(key, self.endpoints.len());
        self.endpoints.push(definition);
        Ok(())
    }

    /// First endpoint, in registration order, whose pattern matches `path`.
    pub fn lookup(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.endpoints.iter().find_map(|endpoint| {
            endpoint.match_path(path).map(|path_params| RouteMatch {
                endpoint,
                path_params,
            })
        })
    }

    /// Whether an endpoint with the same normalized pattern exists.
    pub fn contains(&self, pattern: &str) -> bool {
        parse_pattern(pattern)
            .map(|segments| self.index.contains_key(&normalized_key(&segments)))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDefinition> {
        self.endpoints.iter()
    }
}

/// Split a raw request target into path and parsed query parameters.
pub fn split_target(target: &str) -> (&str, HashMap<String, String>) {
    match target.split_once('?') {
        Some((path, query)) => (path, parse_query_string(query)),
        None => (target, HashMap::new()),
    }
}

/// Parse a query string into a map of parameters
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let mut split = part.splitn(2, '=');
            let key = split.next()?;
            let value = split.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
