//! Scoped "run as tenant" execution for non-request work.

use std::future::Future;

use tracing::{debug, error};
use vigil_core::TenantId;

use super::store::{TenantContextError, TenantContextStore};
use crate::auth::security::SECURITY_TARGET;

/// Runs a unit of work within a tenant's scope.
///
/// This is the only sanctioned way for schedulers and background jobs to
/// reach tenant-scoped data. The context is set before `work` is created and
/// cleared on every exit path: success, error, panic, or cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantContextRunner;

impl TenantContextRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs `work` as `tenant` and returns its result unchanged.
    ///
    /// # Errors
    ///
    /// Fails with [`TenantContextError::AlreadySet`] (converted into `E`)
    /// without running `work` when called while a tenant context is already
    /// active; otherwise propagates `work`'s own error.
    pub async fn run_as<W, Fut, T, E>(&self, tenant: TenantId, work: W) -> Result<T, E>
    where
        W: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TenantContextError>,
    {
        if TenantContextStore::get().is_some() {
            error!(
                target: SECURITY_TARGET,
                "run_as called while a tenant context is active; refusing to nest"
            );
            return Err(TenantContextError::AlreadySet.into());
        }

        TenantContextStore::scope(async move {
            let _guard = TenantContextStore::enter(tenant)?;
            debug!(tenant = %tenant, "running unit of work in tenant scope");
            work().await
        })
        .await
    }
}
