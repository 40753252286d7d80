use crate::types::Principal;

/// Per-request context carrying identity and tracing information.
///
/// The tenant is deliberately absent: it lives only in the unit-of-work
/// scoped tenant context on the server side, so it cannot be copied out of
/// the request that set it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Identifier of the server node handling this request.
    pub node_id: String,
    /// Authenticated principal for this request.
    pub principal: Principal,
    /// Request identifier (`X-Request-Id`) for log correlation.
    pub request_id: String,
}

impl RequestContext {
    /// Context for work that has no inbound request, e.g. background jobs.
    /// Runs as [`Principal::System`], which no role check accepts.
    #[must_use]
    pub fn system(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            principal: Principal::System,
            request_id: String::new(),
        }
    }
}
