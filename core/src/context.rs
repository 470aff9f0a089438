//! Per-request context forwarded to every outbound call.
//!
//! A [`RequestContext`] is the "auth context" capability: it always carries a
//! correlation id, and carries the caller's `Authorization` header only when the
//! inbound request had one. Components never branch on whether the caller was
//! authenticated; they forward whatever the context holds.

use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Header name for the forwarded credentials.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Longest inbound correlation id that is propagated as-is.
pub const MAX_CORRELATION_ID_LEN: usize = 128;

/// Accept a caller-supplied correlation id.
///
/// Any non-blank printable ASCII value up to [`MAX_CORRELATION_ID_LEN`]
/// characters is kept verbatim; it does not have to be a UUID.
#[must_use]
pub fn accept_correlation_id(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let printable = trimmed.bytes().all(|b| b.is_ascii_graphic() || b == b' ');
    (!trimmed.is_empty() && trimmed.len() <= MAX_CORRELATION_ID_LEN && printable)
        .then_some(trimmed)
}

/// Correlation id and optional credentials of one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    correlation_id: String,
    authorization: Option<String>,
}

impl RequestContext {
    /// Create a context without credentials.
    #[must_use]
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            authorization: None,
        }
    }

    /// Create a context with a freshly generated correlation id.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Attach the inbound `Authorization` header value, copied verbatim.
    #[must_use]
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Correlation id of the inbound request.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// The forwarded `Authorization` value, if the caller sent one.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// Headers to attach to an outbound request.
    #[must_use]
    pub fn outbound_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![(CORRELATION_ID_HEADER, self.correlation_id.clone())];
        if let Some(authorization) = &self.authorization {
            headers.push((AUTHORIZATION_HEADER, authorization.clone()));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_context_only_carries_correlation_id() {
        let ctx = RequestContext::new("trace-abc-123");

        assert_eq!(ctx.authorization(), None);
        assert_eq!(
            ctx.outbound_headers(),
            vec![(CORRELATION_ID_HEADER, "trace-abc-123".to_string())]
        );
    }

    #[test]
    fn test_generated_id_is_a_uuid() {
        let ctx = RequestContext::generate();
        assert!(Uuid::parse_str(ctx.correlation_id()).is_ok());
    }

    #[test]
    fn test_accepted_correlation_ids() {
        assert_eq!(accept_correlation_id(" trace-abc-123 "), Some("trace-abc-123"));
        assert_eq!(accept_correlation_id("req 42/a"), Some("req 42/a"));
        assert_eq!(accept_correlation_id(""), None);
        assert_eq!(accept_correlation_id("   "), None);
        assert_eq!(accept_correlation_id("tab\there"), None);
        assert_eq!(accept_correlation_id(&"x".repeat(MAX_CORRELATION_ID_LEN + 1)), None);
    }

    #[test]
    fn test_authorization_forwarded_verbatim() {
        let ctx = RequestContext::generate().with_authorization("Bearer abc.def.ghi");

        let headers = ctx.outbound_headers();
        assert!(headers.contains(&(AUTHORIZATION_HEADER, "Bearer abc.def.ghi".to_string())));
        assert_eq!(headers.len(), 2);
    }
}
