//! Per-request context injected by middleware.

/// Values the API gateway forwards as headers on every call.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    /// `X-ORG`: the organization the caller acts for.
    pub organization_id: Option<String>,
    /// `X-Forwarded-For`
    pub requesting_ip: Option<String>,
    /// `X-Request-Url`: the URL the client called on the gateway.
    pub request_url: Option<String>,
}

impl RequestContext {
    pub fn require_organization(&self) -> crate::Result<&str> {
        self.organization_id
            .as_deref()
            .ok_or_else(|| crate::Error::BadRequest("Missing organization header".to_string()))
    }
}
