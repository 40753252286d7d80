//! Platform administration endpoints (`/api/admin/...`).
//!
//! Reached only after the admin pipeline resolved an admin principal. These
//! handlers never enter a tenant context; the operation guard rejects admin
//! operations that find one.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use vigil_core::{TenantId, TenantRole, UserAccount, UserId};

use super::{unexpected, ApiError, AppState, Caller};
use crate::service::{Operation, OperationResponse};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub tenant_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub tenant_id: i64,
    pub email: String,
    pub role: TenantRole,
}

/// `GET /api/admin/users[?tenant_id=N]`
pub async fn list_users_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserAccount>>, ApiError> {
    let tenant_id = query.tenant_id.map(TenantId::new).transpose()?;
    let op = Operation::ListUsers {
        ctx: caller.context(&state.operations),
        tenant_id,
    };
    match state.operations.execute(op).await? {
        OperationResponse::Users(users) => Ok(Json(users)),
        other => Err(unexpected(&other)),
    }
}

/// `POST /api/admin/users`: creates a user pending activation.
pub async fn create_user_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserAccount>), ApiError> {
    let op = Operation::CreateUser {
        ctx: caller.context(&state.operations),
        tenant_id: TenantId::new(body.tenant_id)?,
        email: body.email,
        role: body.role,
    };
    match state.operations.execute(op).await? {
        OperationResponse::User(user) => Ok((StatusCode::CREATED, Json(user))),
        other => Err(unexpected(&other)),
    }
}

/// `POST /api/admin/users/{id}/suspend`
pub async fn suspend_user_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<UserAccount>, ApiError> {
    let op = Operation::SuspendUser {
        ctx: caller.context(&state.operations),
        user_id: UserId::new(id)?,
    };
    match state.operations.execute(op).await? {
        OperationResponse::User(user) => Ok(Json(user)),
        other => Err(unexpected(&other)),
    }
}

/// `DELETE /api/admin/users/{id}`: soft delete.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let op = Operation::DeleteUser {
        ctx: caller.context(&state.operations),
        user_id: UserId::new(id)?,
    };
    match state.operations.execute(op).await? {
        OperationResponse::User(_) => Ok(StatusCode::NO_CONTENT),
        other => Err(unexpected(&other)),
    }
}
