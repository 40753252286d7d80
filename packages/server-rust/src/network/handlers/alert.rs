//! Whistleblower channel endpoints (`/api/alert/...`).
//!
//! The dispatcher forces the principal to Anonymous and strips any bearer
//! credential. The tenant comes from the reporter-supplied company id: it
//! must name an active tenant, and only then is it entered as this request's
//! context. Unknown and inactive companies look the same to the caller.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use vigil_core::{CaseStatus, TenantId};

use super::{unexpected, ApiError, AppState, Caller};
use crate::service::{Operation, OperationError, OperationResponse};
use crate::tenancy::TenantContextStore;

#[derive(Debug, Deserialize)]
pub struct SubmitAlertRequest {
    pub company_id: i64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct AlertReceipt {
    pub tracking_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AlertStatusView {
    pub status: CaseStatus,
}

/// Validates the company id against the tenant registry.
async fn active_tenant(state: &AppState, company_id: i64) -> Result<TenantId, ApiError> {
    let Ok(tenant) = TenantId::new(company_id) else {
        return Err(ApiError::not_found());
    };
    let record = state
        .tenants
        .find_tenant(tenant)
        .await
        .map_err(|err| ApiError::from(OperationError::Internal(err)))?;
    match record {
        Some(record) if record.active => Ok(tenant),
        _ => {
            debug!("alert for unknown or inactive company rejected");
            Err(ApiError::not_found())
        }
    }
}

/// `POST /api/alert/submit`
pub async fn submit_alert_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<SubmitAlertRequest>,
) -> Result<(StatusCode, Json<AlertReceipt>), ApiError> {
    let tenant = active_tenant(&state, body.company_id).await?;
    let _tenant = TenantContextStore::enter(tenant)?;
    let op = Operation::SubmitAlert {
        ctx: caller.context(&state.operations),
        title: body.title,
        body: body.body,
    };
    match state.operations.execute(op).await? {
        OperationResponse::AlertReceipt { tracking_id } => {
            Ok((StatusCode::CREATED, Json(AlertReceipt { tracking_id })))
        }
        other => Err(unexpected(&other)),
    }
}

/// `GET /api/alert/status/{company_id}/{tracking_id}`
pub async fn alert_status_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path((company_id, tracking_id)): Path<(i64, Uuid)>,
) -> Result<Json<AlertStatusView>, ApiError> {
    let tenant = active_tenant(&state, company_id).await?;
    let _tenant = TenantContextStore::enter(tenant)?;
    let op = Operation::AlertStatus {
        ctx: caller.context(&state.operations),
        tracking_id,
    };
    match state.operations.execute(op).await? {
        OperationResponse::AlertStatus { status } => Ok(Json(AlertStatusView { status })),
        other => Err(unexpected(&other)),
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::{Principal, TenantRole, TenantUserPrincipal, UserId};

    use super::*;
    use crate::network::handlers::test_support;

    fn anonymous() -> Caller {
        Caller {
            principal: Principal::Anonymous,
            request_id: String::new(),
        }
    }

    fn alert(company_id: i64) -> Json<SubmitAlertRequest> {
        Json(SubmitAlertRequest {
            company_id,
            title: "Invoice fraud".to_string(),
            body: "details".to_string(),
        })
    }

    #[tokio::test]
    async fn submit_then_track() {
        let (state, _) = test_support::state();
        let (status, Json(receipt)) = TenantContextStore::scope(submit_alert_handler(
            State(state.clone()),
            anonymous(),
            alert(42),
        ))
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(view) = TenantContextStore::scope(alert_status_handler(
            State(state.clone()),
            anonymous(),
            Path((42, receipt.tracking_id)),
        ))
        .await
        .unwrap();
        assert_eq!(view.status, CaseStatus::New);

        // Same tracking id, another company: indistinguishable from unknown.
        let err = TenantContextStore::scope(alert_status_handler(
            State(state),
            anonymous(),
            Path((43, receipt.tracking_id)),
        ))
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_inactive_and_invalid_companies_are_not_found() {
        let (state, _) = test_support::state();
        for company_id in [43, 999, 0, -1] {
            let err = TenantContextStore::scope(submit_alert_handler(
                State(state.clone()),
                anonymous(),
                alert(company_id),
            ))
            .await
            .unwrap_err();
            assert_eq!(err.status(), StatusCode::NOT_FOUND, "company {company_id}");
        }
    }

    #[tokio::test]
    async fn context_is_cleared_when_the_handler_returns() {
        let (state, _) = test_support::state();
        TenantContextStore::scope(async {
            submit_alert_handler(State(state), anonymous(), alert(42))
                .await
                .unwrap();
            assert_eq!(TenantContextStore::get(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn staff_principal_cannot_submit() {
        let (state, _) = test_support::state();
        let caller = Caller {
            principal: Principal::TenantUser(TenantUserPrincipal {
                id: UserId::new(3).unwrap(),
                tenant_id: TenantId::new(42).unwrap(),
                role: TenantRole::Responder,
            }),
            request_id: String::new(),
        };
        let err = TenantContextStore::scope(submit_alert_handler(State(state), caller, alert(42)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
