//! Per-request context
//!
//! Built by the outermost middleware from headers, then extended by the route
//! middleware (auth, path ids, export parameters). Handlers and the
//! attribution client only ever read it.

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// `X-Request-Id`, generated when the client sent none.
    pub request_id: String,
    /// Organization the caller acts for (from the token, `X-ORG`, or an admin path).
    pub organization_id: Option<String>,
    pub group_id: Option<String>,
    pub file_name: Option<String>,
    pub implementer_id: Option<String>,
    pub job_id: Option<String>,
    /// `X-Forwarded-For`, else the peer address.
    pub requesting_ip: Option<String>,
    /// Full URL the client called, forwarded as `X-Request-Url`.
    pub request_url: Option<String>,
    /// Validated `_type` of an export request.
    pub resource_types: Option<String>,
    /// Validated `_since` of an export request, RFC 3339.
    pub since: Option<String>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }
}
