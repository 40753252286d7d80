//! Whistleblower channel: alert submission and status lookup.
//!
//! Both operations run with an Anonymous principal under the tenant context
//! the HTTP layer derived from the reporter-supplied company id. The
//! reporter only ever learns the opaque tracking id and the case status.

use tracing::info;

use super::require_anonymous;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::storage::{unix_now, CaseRepository, NewCase};
use crate::tenancy::TenantScopedDataGate;

const MAX_TITLE_CHARS: usize = 200;
const MAX_BODY_CHARS: usize = 20_000;

pub struct AlertService {
    gate: TenantScopedDataGate<dyn CaseRepository>,
}

impl AlertService {
    #[must_use]
    pub fn new(gate: TenantScopedDataGate<dyn CaseRepository>) -> Self {
        Self { gate }
    }

    async fn handle(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        match op {
            Operation::SubmitAlert { ctx, title, body } => {
                require_anonymous(&ctx, "submit_alert")?;
                let title = title.trim();
                if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
                    return Err(OperationError::InvalidInput(format!(
                        "title must be 1-{MAX_TITLE_CHARS} characters"
                    )));
                }
                if body.trim().is_empty() || body.chars().count() > MAX_BODY_CHARS {
                    return Err(OperationError::InvalidInput(format!(
                        "body must be 1-{MAX_BODY_CHARS} characters"
                    )));
                }

                let case = self
                    .gate
                    .insert_case(NewCase {
                        title: title.to_string(),
                        body,
                        created_at: unix_now(),
                    })
                    .await?;
                info!(case = %case.id, "alert received");
                Ok(OperationResponse::AlertReceipt {
                    tracking_id: case.tracking_id,
                })
            }
            Operation::AlertStatus { ctx, tracking_id } => {
                require_anonymous(&ctx, "alert_status")?;
                self.gate
                    .find_case_by_tracking(tracking_id)
                    .await?
                    .map(|case| OperationResponse::AlertStatus {
                        status: case.status,
                    })
                    .ok_or(OperationError::NotFound)
            }
            _ => Err(OperationError::WrongService),
        }
    }
}

domain_service!(AlertService);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower::ServiceExt;
    use uuid::Uuid;
    use vigil_core::{CaseStatus, Principal, RequestContext, TenantId};

    use super::*;
    use crate::service::operation::OperationContext;
    use crate::storage::MemoryCaseStore;
    use crate::tenancy::TenantContextRunner;

    fn anonymous() -> OperationContext {
        let request = RequestContext {
            node_id: "test".to_string(),
            principal: Principal::Anonymous,
            request_id: "req".to_string(),
        };
        OperationContext::new(1, request, 5_000)
    }

    fn service() -> Arc<AlertService> {
        let store: Arc<dyn CaseRepository> = Arc::new(MemoryCaseStore::new());
        Arc::new(AlertService::new(TenantScopedDataGate::new(store)))
    }

    fn submit(title: &str, body: &str) -> Operation {
        Operation::SubmitAlert {
            ctx: anonymous(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn submitted_alert_is_trackable_only_within_its_tenant() {
        let svc = service();
        let runner = TenantContextRunner::new();
        let acme = TenantId::new(42).unwrap();

        let receipt = runner
            .run_as(acme, || Arc::clone(&svc).oneshot(submit("Fraud", "details")))
            .await
            .unwrap();
        let OperationResponse::AlertReceipt { tracking_id } = receipt else {
            panic!("expected receipt");
        };

        let status = runner
            .run_as(acme, || {
                Arc::clone(&svc).oneshot(Operation::AlertStatus {
                    ctx: anonymous(),
                    tracking_id,
                })
            })
            .await
            .unwrap();
        assert!(matches!(
            status,
            OperationResponse::AlertStatus {
                status: CaseStatus::New
            }
        ));

        let elsewhere = runner
            .run_as(TenantId::new(43).unwrap(), || {
                svc.oneshot(Operation::AlertStatus {
                    ctx: anonymous(),
                    tracking_id,
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(elsewhere, OperationError::NotFound));
    }

    #[tokio::test]
    async fn rejects_empty_title_and_unknown_tracking_id() {
        let svc = service();
        let runner = TenantContextRunner::new();
        let acme = TenantId::new(42).unwrap();

        let err = runner
            .run_as(acme, || Arc::clone(&svc).oneshot(submit("   ", "x")))
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::InvalidInput(_)));

        let err = runner
            .run_as(acme, || {
                svc.oneshot(Operation::AlertStatus {
                    ctx: anonymous(),
                    tracking_id: Uuid::new_v4(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::NotFound));
    }

    #[tokio::test]
    async fn internal_work_cannot_pose_as_the_whistleblower() {
        let svc = service();
        let err = TenantContextRunner::new()
            .run_as(TenantId::new(42).unwrap(), || {
                svc.oneshot(Operation::SubmitAlert {
                    ctx: OperationContext::new(1, RequestContext::system("test"), 5_000),
                    title: "t".to_string(),
                    body: "b".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::Forbidden {
                principal: "system",
                ..
            }
        ));
    }
}
