//! Staff panel endpoints (`/api/panel/...`).
//!
//! The dispatcher has already resolved a tenant user and entered its tenant
//! context before any of these run, so case access is scoped by the data
//! gate without the handler naming a tenant.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use vigil_core::{CaseId, CaseStatus};

use super::{unexpected, ApiError, AppState, Caller};
use crate::service::{Operation, OperationResponse};
use crate::storage::CaseRecord;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CaseStatus,
}

/// `GET /api/panel/cases`
pub async fn list_cases_handler(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<CaseRecord>>, ApiError> {
    let op = Operation::ListCases {
        ctx: caller.context(&state.operations),
    };
    match state.operations.execute(op).await? {
        OperationResponse::Cases(cases) => Ok(Json(cases)),
        other => Err(unexpected(&other)),
    }
}

/// `GET /api/panel/cases/{id}`
pub async fn get_case_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<CaseRecord>, ApiError> {
    let op = Operation::GetCase {
        ctx: caller.context(&state.operations),
        case_id: CaseId::new(id)?,
    };
    match state.operations.execute(op).await? {
        OperationResponse::Case(case) => Ok(Json(case)),
        other => Err(unexpected(&other)),
    }
}

/// `POST /api/panel/cases/{id}/status`
pub async fn update_case_status_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<CaseRecord>, ApiError> {
    let op = Operation::UpdateCaseStatus {
        ctx: caller.context(&state.operations),
        case_id: CaseId::new(id)?,
        status: body.status,
    };
    match state.operations.execute(op).await? {
        OperationResponse::Case(case) => Ok(Json(case)),
        other => Err(unexpected(&other)),
    }
}
