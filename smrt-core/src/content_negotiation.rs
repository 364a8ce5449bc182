//! Media types and `Accept` header parsing.
//!
//! Endpoints declare the media type they consume and the one they produce.
//! This module answers the two questions the negotiation matcher asks:
//! does a request's `Content-Type` satisfy the consumed type, and does its
//! `Accept` header admit the produced type.
//!
//! # Examples
//!
//! ```
//! use smrt_core::content_negotiation::{Accept, MediaType};
//!
//! let accept = Accept::parse("application/json, text/*;q=0.5");
//! assert!(accept.accepts(&MediaType::json()));
//! assert!(accept.accepts(&MediaType::new("text", "plain")));
//! assert!(!accept.accepts(&MediaType::new("image", "png")));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Media Types
// ============================================================================

/// Represents a media type (MIME type) with optional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// The type (e.g., "application", "text", "image")
    pub type_: String,
    /// The subtype (e.g., "json", "x.greet.v1+json")
    pub subtype: String,
    /// Optional parameters (e.g., charset=utf-8)
    pub params: HashMap<String, String>,
}

impl MediaType {
    /// Create a new media type.
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into().to_lowercase(),
            subtype: subtype.into().to_lowercase(),
            params: HashMap::new(),
        }
    }

    /// Create a media type with a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Create `application/json` media type.
    pub fn json() -> Self {
        Self::new("application", "json")
    }

    /// Create `*/*` wildcard media type.
    pub fn any() -> Self {
        Self::new("*", "*")
    }

    /// Parse a media type from a string (without quality value).
    ///
    /// Returns `None` unless the value has a non-empty `type/subtype` pair.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let mut parts = s.split(';');

        let type_subtype = parts.next()?.trim();
        let (type_, subtype) = type_subtype.split_once('/')?;
        let type_ = type_.trim().to_lowercase();
        let subtype = subtype.trim().to_lowercase();
        if type_.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut params = HashMap::new();
        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                let key = key.trim().to_lowercase();
                // Quality is a property of the Accept entry, not of the type
                if key != "q" {
                    params.insert(key, value.trim().trim_matches('"').to_string());
                }
            }
        }

        Some(Self {
            type_,
            subtype,
            params,
        })
    }

    /// Check if this media type matches another (considering wildcards on either side).
    pub fn matches(&self, other: &MediaType) -> bool {
        let type_matches = self.type_ == "*" || other.type_ == "*" || self.type_ == other.type_;
        let subtype_matches =
            self.subtype == "*" || other.subtype == "*" || self.subtype == other.subtype;
        type_matches && subtype_matches
    }

    /// Exact `type/subtype` equality, parameters ignored.
    pub fn essence_eq(&self, other: &MediaType) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }

    /// Check if this is a wildcard type (`*/*`).
    pub fn is_any(&self) -> bool {
        self.type_ == "*" && self.subtype == "*"
    }

    /// `application/json` or any `+json` structured-syntax suffix.
    pub fn is_json(&self) -> bool {
        self.subtype == "json" || self.subtype.ends_with("+json")
    }

    /// Get the full MIME type string.
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// Get the full MIME type string with parameters.
    pub fn to_header_value(&self) -> String {
        let mut result = self.mime_type();
        let mut params: Vec<_> = self.params.iter().collect();
        params.sort();
        for (key, value) in params {
            result.push_str(&format!("; {}={}", key, value));
        }
        result
    }

    fn specificity(&self) -> u8 {
        let mut score = 0u8;
        if self.type_ != "*" {
            score += 2;
        }
        if self.subtype != "*" {
            score += 1;
        }
        score
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_header_value())
    }
}

// ============================================================================
// Accept Header
// ============================================================================

/// Represents a parsed `Accept` header with quality values.
#[derive(Debug, Clone, Default)]
pub struct Accept {
    /// Media types with their quality values, sorted by preference.
    pub media_types: Vec<(MediaType, f32)>,
}

impl Accept {
    /// Parse an Accept header string.
    ///
    /// Unparseable entries are dropped.
    pub fn parse(header: &str) -> Self {
        let mut media_types: Vec<(MediaType, f32)> = header
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }

                let (media_part, quality) = Self::extract_quality(part);
                MediaType::parse(media_part).map(|mt| (mt, quality))
            })
            .collect();

        // Highest quality first, then most specific
        media_types.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
            Some(Ordering::Equal) | None => b.0.specificity().cmp(&a.0.specificity()),
            Some(ord) => ord,
        });

        Self { media_types }
    }

    /// Extract quality value from a media type string.
    fn extract_quality(s: &str) -> (&str, f32) {
        let mut media_end = s.len();
        let mut quality = 1.0;

        let mut offset: usize = 0;
        for segment in s.split(';') {
            let trimmed = segment.trim();
            if let Some(q) = trimmed
                .strip_prefix("q=")
                .or_else(|| trimmed.strip_prefix("Q="))
            {
                media_end = media_end.min(offset.saturating_sub(1));
                quality = q.trim().parse::<f32>().unwrap_or(1.0).clamp(0.0, 1.0);
            }
            offset += segment.len() + 1;
        }

        (&s[..media_end], quality)
    }

    /// Check if a media type is acceptable (quality above zero).
    pub fn accepts(&self, media_type: &MediaType) -> bool {
        self.quality_for(media_type) > 0.0
    }

    /// Get the quality value for a specific media type.
    ///
    /// The most specific matching entry decides, so `*/*, text/html;q=0`
    /// rejects `text/html` while still accepting everything else.
    pub fn quality_for(&self, media_type: &MediaType) -> f32 {
        self.media_types
            .iter()
            .filter(|(mt, _)| mt.matches(media_type))
            .max_by_key(|(mt, _)| mt.specificity())
            .map(|(_, quality)| *quality)
            .unwrap_or(0.0)
    }

    /// Whether the header only says "anything".
    pub fn is_wildcard_only(&self) -> bool {
        !self.media_types.is_empty() && self.media_types.iter().all(|(mt, _)| mt.is_any())
    }

    /// Get the preferred media type from this Accept header.
    pub fn preferred(&self) -> Option<&MediaType> {
        self.media_types.first().map(|(mt, _)| mt)
    }
}

/// Does a request's `Content-Type` satisfy an endpoint's consumed type?
///
/// Only `type/subtype` is compared; parameters such as `charset` are
/// ignored. An absent or unparseable header never satisfies.
pub fn content_type_satisfies(content_type: Option<&str>, required: &MediaType) -> bool {
    content_type
        .and_then(MediaType::parse)
        .is_some_and(|provided| provided.essence_eq(required))
}

/// Does a request's `Accept` header admit an endpoint's produced type?
///
/// An absent header does not: endpoints that declare what they produce
/// require the client to ask for it, at least via `*/*`.
pub fn accept_satisfies(accept: Option<&str>, produced: &MediaType) -> bool {
    accept
        .map(Accept::parse)
        .is_some_and(|accept| accept.accepts(produced))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vendor_type() {
        let mt = MediaType::parse("application/x.greet.v1+json; charset=UTF-8").unwrap();
        assert_eq!(mt.type_, "application");
        assert_eq!(mt.subtype, "x.greet.v1+json");
        assert_eq!(mt.params.get("charset"), Some(&"UTF-8".to_string()));
        assert!(mt.is_json());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(MediaType::parse("").is_none());
        assert!(MediaType::parse("json").is_none());
        assert!(MediaType::parse("application/").is_none());
    }

    #[test]
    fn test_accept_sorting() {
        let accept = Accept::parse("*/*;q=0.1, text/html;q=0.9, application/json");
        assert_eq!(accept.media_types.len(), 3);
        assert_eq!(accept.preferred(), Some(&MediaType::json()));
        assert_eq!(accept.media_types[2].0, MediaType::any());
    }

    #[test]
    fn test_accept_wildcards() {
        let produced = MediaType::parse("application/x.greeting.v1+json").unwrap();
        assert!(accept_satisfies(Some("*/*"), &produced));
        assert!(accept_satisfies(Some("application/*"), &produced));
        assert!(accept_satisfies(Some("application/x.greeting.v1+json"), &produced));
        assert!(!accept_satisfies(Some("text/*"), &produced));
        assert!(!accept_satisfies(Some("application/json"), &produced));
        assert!(!accept_satisfies(None, &produced));
    }

    #[test]
    fn test_accept_zero_quality_excludes() {
        let accept = Accept::parse("*/*, text/html;q=0");
        assert!(!accept.accepts(&MediaType::new("text", "html")));
        assert!(accept.accepts(&MediaType::json()));
    }

    #[test]
    fn test_quality_with_extra_params() {
        let accept = Accept::parse("application/json;q=0.5;level=1");
        assert_eq!(accept.media_types.len(), 1);
        assert!((accept.quality_for(&MediaType::json()) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_extract_quality_strips_from_q() {
        let (media, quality) = Accept::extract_quality("text/html;level=1;q=0.3");
        assert_eq!(media, "text/html;level=1");
        assert!((quality - 0.3).abs() < f32::EPSILON);

        let (media, quality) = Accept::extract_quality("application/json");
        assert_eq!(media, "application/json");
        assert!((quality - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_content_type_satisfies() {
        let required = MediaType::parse("application/x.greet.v1+json").unwrap();
        assert!(content_type_satisfies(
            Some("application/x.greet.v1+json"),
            &required
        ));
        assert!(content_type_satisfies(
            Some("Application/X.Greet.V1+JSON; charset=utf-8"),
            &required
        ));
        assert!(!content_type_satisfies(Some("application/json"), &required));
        assert!(!content_type_satisfies(Some("*/*"), &required));
        assert!(!content_type_satisfies(None, &required));
    }

    #[test]
    fn test_wildcard_only() {
        assert!(Accept::parse("*/*").is_wildcard_only());
        assert!(!Accept::parse("*/*, text/html").is_wildcard_only());
        assert!(!Accept::parse("").is_wildcard_only());
    }
}
