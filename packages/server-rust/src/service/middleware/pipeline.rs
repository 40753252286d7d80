//! Pipeline composition: combines all middleware layers into a single service stack.

use tower::util::BoxCloneService;
use tower::ServiceBuilder;

use super::admission::AdmissionLayer;
use super::metrics::MetricsLayer;
use super::tenant_guard::TenantGuardLayer;
use crate::service::config::ServerConfig;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::service::router::OperationRouter;

/// The composed, type-erased operation pipeline.
pub type OperationPipeline = BoxCloneService<Operation, OperationResponse, OperationError>;

/// Build the operation pipeline by wrapping the `OperationRouter` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `AdmissionLayer`: shed when saturated, then enforce the call deadline
/// 2. `MetricsLayer`: record timing and outcome, including guard denials
/// 3. `TenantGuardLayer`: check the tenant requirement right before routing
///
/// Every layer runs inline in the caller's task. Nothing here may spawn or
/// buffer, since the tenant context is task-local.
#[must_use]
pub fn build_operation_pipeline(router: OperationRouter, config: &ServerConfig) -> OperationPipeline {
    BoxCloneService::new(
        ServiceBuilder::new()
            .layer(AdmissionLayer::new(config.max_concurrent_operations))
            .layer(MetricsLayer)
            .layer(TenantGuardLayer)
            .service(router),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
