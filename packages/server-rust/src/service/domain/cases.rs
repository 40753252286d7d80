//! Staff panel case handling.

use tracing::{debug, info};

use super::require_staff;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::storage::{unix_now, CaseRepository};
use crate::tenancy::TenantScopedDataGate;
use vigil_core::CaseStatus;

/// Case operations for the current tenant. Every storage call goes through
/// the data gate, so the tenant is never passed by hand.
pub struct CaseService {
    gate: TenantScopedDataGate<dyn CaseRepository>,
}

impl CaseService {
    #[must_use]
    pub fn new(gate: TenantScopedDataGate<dyn CaseRepository>) -> Self {
        Self { gate }
    }

    async fn handle(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        match op {
            Operation::ListCases { ctx } => {
                require_staff(&ctx, "list_cases")?;
                Ok(OperationResponse::Cases(self.gate.list_cases().await?))
            }
            Operation::GetCase { ctx, case_id } => {
                require_staff(&ctx, "get_case")?;
                self.gate
                    .find_case(case_id)
                    .await?
                    .map(OperationResponse::Case)
                    .ok_or(OperationError::NotFound)
            }
            Operation::UpdateCaseStatus {
                ctx,
                case_id,
                status,
            } => {
                let actor = require_staff(&ctx, "update_case_status")?;
                if status == CaseStatus::New {
                    return Err(OperationError::InvalidInput(
                        "a case cannot be moved back to new".to_string(),
                    ));
                }
                let case = self
                    .gate
                    .update_case_status(case_id, status, unix_now())
                    .await?
                    .ok_or(OperationError::NotFound)?;
                info!(case = %case.id, actor = %actor.id, status = ?status, "case status changed");
                Ok(OperationResponse::Case(case))
            }
            Operation::FindStaleCases {
                ctx: _,
                older_than_secs,
            } => {
                // Internal only: issued by the background sweep, never routed
                // from HTTP.
                let cutoff = unix_now().saturating_sub(older_than_secs);
                let stale: Vec<_> = self
                    .gate
                    .list_cases()
                    .await?
                    .into_iter()
                    .filter(|c| c.status == CaseStatus::New && c.updated_at <= cutoff)
                    .collect();
                debug!(count = stale.len(), "stale case scan finished");
                Ok(OperationResponse::Cases(stale))
            }
            _ => Err(OperationError::WrongService),
        }
    }
}

domain_service!(CaseService);
