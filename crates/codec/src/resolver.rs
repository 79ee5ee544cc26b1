//! Error-response resolution
//!
//! Maps a failed HTTP response onto the operation's error taxonomy. The
//! `x-amzn-errortype` header wins over any body-level code; the raw code
//! is sanitized (namespace prefix and URL suffix stripped) before the
//! registry lookup.

use std::collections::HashMap;

use crate::error::{CodecError, Result};
use crate::http::Readable;
use crate::json::scan_json_error_body;
use crate::xml::scan_xml_error_body;

/// Whether an error is the caller's fault or the service's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Client,
    Server,
}

/// Static description of one error variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
    /// The wire code this variant resolves from.
    pub code: String,
    pub source: ErrorSource,
    pub status: u16,
    pub retryable: bool,
}

impl ErrorDescriptor {
    pub fn new(code: impl Into<String>, source: ErrorSource) -> Self {
        ErrorDescriptor {
            code: code.into(),
            source,
            status: match source {
                ErrorSource::Client => 400,
                ErrorSource::Server => 500,
            },
            retryable: false,
        }
    }

    /// Override the default 400/500 with an `httpError` status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

/// Code → descriptor lookup for one operation's aggregated errors
/// (operation ∪ service ∪ inherited resource errors).
#[derive(Debug, Default)]
pub struct ErrorRegistry {
    by_code: HashMap<String, ErrorDescriptor>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: ErrorDescriptor) {
        self.by_code.insert(descriptor.code.clone(), descriptor);
    }

    pub fn get(&self, code: &str) -> Option<&ErrorDescriptor> {
        self.by_code.get(code)
    }
}

/// Which payload encoding the error body uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    Json,
    Xml,
}

/// A resolved error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedError {
    pub code: String,
    pub message: Option<String>,
    pub source: ErrorSource,
    pub status: u16,
    pub retryable: bool,
}

/// Resolve a failed response to a variant descriptor.
pub fn resolve_error<R: Readable>(
    registry: &ErrorRegistry,
    response: &R,
    format: ErrorFormat,
) -> Result<ResolvedError> {
    let header_code = response.header("x-amzn-errortype").map(str::to_string);
    let (body_code, body_message) = match format {
        ErrorFormat::Json => scan_json_error_body(response.body()),
        ErrorFormat::Xml => scan_xml_error_body(response.body()),
    };
    let raw = header_code
        .or(body_code)
        .ok_or_else(|| CodecError::UnresolvedResponseError("<no code>".to_string()))?;
    let code = sanitize_error_code(&raw);
    let descriptor = registry
        .get(code)
        .ok_or_else(|| CodecError::UnresolvedResponseError(code.to_string()))?;
    Ok(ResolvedError {
        code: descriptor.code.clone(),
        message: body_message,
        source: descriptor.source,
        status: descriptor.status,
        retryable: descriptor.retryable,
    })
}

/// Strip the `ns#` namespace prefix and any `:`-delimited URL suffix.
pub fn sanitize_error_code(raw: &str) -> &str {
    let after_hash = raw.rsplit_once('#').map_or(raw, |(_, tail)| tail);
    after_hash
        .split_once(':')
        .map_or(after_hash, |(head, _)| head)
}

/// Strip a trailing `error`/`exception` (with or without a `_` separator,
/// case-insensitive) from a variant or field name.
pub fn strip_error_suffix(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    for suffix in ["_error", "_exception", "error", "exception"] {
        if lower.ends_with(suffix) && name.len() > suffix.len() {
            return &name[..name.len() - suffix.len()];
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Response;

    fn registry() -> ErrorRegistry {
        let mut reg = ErrorRegistry::new();
        reg.insert(
            ErrorDescriptor::new("FooError", ErrorSource::Client)
                .with_status(404)
                .retryable(),
        );
        reg.insert(ErrorDescriptor::new("InternalError", ErrorSource::Server));
        reg
    }

    #[test]
    fn header_code_wins_over_body() {
        let response = Response::new(400)
            .with_header("x-amzn-errortype", "FooError:http://example.com/")
            .with_body(r#"{"__type":"ShouldBeIgnored","message":"boom"}"#);
        let resolved = resolve_error(&registry(), &response, ErrorFormat::Json).unwrap();
        assert_eq!(resolved.code, "FooError");
        assert_eq!(resolved.message.as_deref(), Some("boom"));
        assert_eq!(resolved.status, 404);
        assert!(resolved.retryable);
        assert_eq!(resolved.source, ErrorSource::Client);
    }

    #[test]
    fn body_code_used_when_header_absent() {
        let response = Response::new(500)
            .with_body(r#"{"__type":"ns#InternalError","message":"down"}"#);
        let resolved = resolve_error(&registry(), &response, ErrorFormat::Json).unwrap();
        assert_eq!(resolved.code, "InternalError");
        assert_eq!(resolved.status, 500);
        assert_eq!(resolved.source, ErrorSource::Server);
    }

    #[test]
    fn xml_envelope_resolution() {
        let response = Response::new(400)
            .with_body("<ErrorResponse><Error><Code>FooError</Code><Message>m</Message></Error></ErrorResponse>");
        let resolved = resolve_error(&registry(), &response, ErrorFormat::Xml).unwrap();
        assert_eq!(resolved.code, "FooError");
        assert_eq!(resolved.message.as_deref(), Some("m"));
    }

    #[test]
    fn unknown_code_is_unresolved() {
        let response = Response::new(400).with_body(r#"{"__type":"Mystery"}"#);
        assert!(matches!(
            resolve_error(&registry(), &response, ErrorFormat::Json),
            Err(CodecError::UnresolvedResponseError(code)) if code == "Mystery"
        ));
    }

    #[test]
    fn sanitization() {
        assert_eq!(sanitize_error_code("ns#Foo"), "Foo");
        assert_eq!(sanitize_error_code("Foo:http://x/"), "Foo");
        assert_eq!(sanitize_error_code("com.example#Foo:u"), "Foo");
        assert_eq!(sanitize_error_code("Foo"), "Foo");
    }

    #[test]
    fn suffix_stripping() {
        assert_eq!(strip_error_suffix("LimitExceededError"), "LimitExceeded");
        assert_eq!(strip_error_suffix("limit_exceeded_error"), "limit_exceeded");
        assert_eq!(strip_error_suffix("OopsException"), "Oops");
        assert_eq!(strip_error_suffix("Plain"), "Plain");
        assert_eq!(strip_error_suffix("Error"), "Error");
    }
}
