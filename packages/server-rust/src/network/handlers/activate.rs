//! Account activation (`/api/auth/activate`).
//!
//! Public route: no principal, no tenant context. The one-time token is the
//! only proof required.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{unexpected, ApiError, AppState, Caller};
use crate::service::{Operation, OperationResponse};

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub token: String,
}

/// `POST /api/auth/activate`
pub async fn activate_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<ActivateRequest>,
) -> Result<StatusCode, ApiError> {
    if body.token.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "invalid_input"));
    }
    let op = Operation::ActivateUser {
        ctx: caller.context(&state.operations),
        token: body.token,
    };
    match state.operations.execute(op).await? {
        OperationResponse::User(_) => Ok(StatusCode::NO_CONTENT),
        other => Err(unexpected(&other)),
    }
}
