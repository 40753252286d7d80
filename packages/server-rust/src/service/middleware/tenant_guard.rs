//! Tenant requirement guard for operations.
//!
//! Checks each operation's declared [`TenantRequirement`] against the
//! current unit of work's tenant context before the router sees it.
//! Rejected operations never reach a domain service or storage.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::{Layer, Service};
use tracing::{error, warn};

use crate::auth::SECURITY_TARGET;
use crate::service::operation::{
    Operation, OperationError, OperationResponse, TenantRequirement,
};
use crate::tenancy::TenantContextStore;

// ---------------------------------------------------------------------------
// TenantGuardLayer
// ---------------------------------------------------------------------------

/// Tower layer enforcing per-operation tenant requirements.
#[derive(Debug, Clone)]
pub struct TenantGuardLayer;

impl<S> Layer<S> for TenantGuardLayer {
    type Service = TenantGuardService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenantGuardService { inner }
    }
}

// ---------------------------------------------------------------------------
// TenantGuardService
// ---------------------------------------------------------------------------

/// Service wrapper that fails operations whose tenant requirement is unmet.
#[derive(Debug, Clone)]
pub struct TenantGuardService<S> {
    inner: S,
}

impl<S> Service<Operation> for TenantGuardService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let descriptor = op.descriptor();
        let tenant = TenantContextStore::get();

        match (descriptor.tenant, tenant) {
            (TenantRequirement::Required, None) => {
                warn!(
                    target: SECURITY_TARGET,
                    operation = descriptor.name,
                    principal = op.ctx().request.principal.kind(),
                    request_id = %op.ctx().request.request_id,
                    "tenant-scoped operation without tenant context"
                );
                let operation = descriptor.name;
                Box::pin(async move { Err(OperationError::TenantContextMissing { operation }) })
            }
            (TenantRequirement::Forbidden, Some(_)) => {
                error!(
                    target: SECURITY_TARGET,
                    operation = descriptor.name,
                    principal = op.ctx().request.principal.kind(),
                    "platform operation attempted under a tenant context"
                );
                let operation = descriptor.name;
                Box::pin(async move { Err(OperationError::TenantScopeForbidden { operation }) })
            }
            _ => Box::pin(self.inner.call(op)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
