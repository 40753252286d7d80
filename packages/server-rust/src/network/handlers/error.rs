//! Client-facing error rendering.
//!
//! Every failure leaves the server as `{"error": "<kind>"}` with a status
//! code. Internal detail (claims, tenant ids, error chains) only reaches the
//! logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;
use vigil_core::InvalidId;

use crate::auth::AuthError;
use crate::service::OperationError;
use crate::tenancy::TenantContextError;

/// An HTTP error response: status plus a stable failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, kind: &'static str) -> Self {
        Self { status, kind }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found")
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.kind }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status(), err.kind())
    }
}

impl From<InvalidId> for ApiError {
    fn from(_: InvalidId) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input")
    }
}

impl From<TenantContextError> for ApiError {
    fn from(err: TenantContextError) -> Self {
        OperationError::from(err).into()
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::NotFound => Self::not_found(),
            OperationError::Forbidden { .. } | OperationError::TenantScopeForbidden { .. } => {
                Self::new(StatusCode::FORBIDDEN, "forbidden")
            }
            OperationError::TenantContextMissing { .. } => {
                Self::new(StatusCode::FORBIDDEN, "tenant_context_missing")
            }
            OperationError::Conflict(_) => Self::new(StatusCode::CONFLICT, "conflict"),
            OperationError::InvalidInput(_) => Self::new(StatusCode::BAD_REQUEST, "invalid_input"),
            OperationError::Timeout { .. } => Self::new(StatusCode::REQUEST_TIMEOUT, "timeout"),
            OperationError::Overloaded => Self::new(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
            other => {
                error!(error = %other, "operation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::{LifecycleError, UserId};

    use super::*;
    use crate::auth::CodecError;

    async fn body_of(err: ApiError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn renders_only_the_kind() {
        let err = ApiError::from(AuthError::from(CodecError::InvalidSignature));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(err).await, json!({ "error": "invalid_token" }));
    }

    #[test]
    fn operation_errors_map_to_statuses() {
        let cases = [
            (OperationError::NotFound, StatusCode::NOT_FOUND),
            (
                OperationError::TenantContextMissing {
                    operation: "list_cases",
                },
                StatusCode::FORBIDDEN,
            ),
            (
                OperationError::TenantScopeForbidden {
                    operation: "list_users",
                },
                StatusCode::FORBIDDEN,
            ),
            (
                OperationError::Conflict(LifecycleError::SoleManager {
                    user_id: UserId::new(1).unwrap(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                OperationError::InvalidInput("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (OperationError::Overloaded, StatusCode::SERVICE_UNAVAILABLE),
            (
                OperationError::Timeout { timeout_ms: 10 },
                StatusCode::REQUEST_TIMEOUT,
            ),
            (
                OperationError::Internal(anyhow::anyhow!("db down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn internal_detail_is_not_echoed() {
        let err = ApiError::from(OperationError::Internal(anyhow::anyhow!(
            "tenant 42 query failed"
        )));
        assert_eq!(body_of(err).await, json!({ "error": "internal" }));
    }
}
