//! Task-local tenant context store.
//!
//! Each unit of work (one inbound request, or one `run_as` invocation) owns a
//! fresh slot created by [`TenantContextStore::scope`]. The slot starts empty
//! and is dropped together with the unit of work, including when the work
//! fails, panics, or is cancelled by dropping its future. Tasks spawned from
//! inside a scope do not inherit it, so concurrent work never observes
//! another unit's tenant.

use std::cell::Cell;
use std::future::Future;

use tracing::error;
use vigil_core::TenantId;

use crate::auth::security::SECURITY_TARGET;

tokio::task_local! {
    static CURRENT_TENANT: Cell<Option<TenantId>>;
}

/// Misuse of the tenant context store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TenantContextError {
    /// `set` while a tenant is already present: nested or leaked context.
    #[error("tenant context is already set for this unit of work")]
    AlreadySet,
    /// `set` outside any unit of work.
    #[error("no unit of work is active")]
    NoUnitOfWork,
    /// A tenant was required but none is set.
    #[error("tenant context missing")]
    Missing,
}

/// Accessor for the current unit of work's tenant slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantContextStore;

impl TenantContextStore {
    /// Runs `fut` as a new unit of work with an empty tenant slot.
    ///
    /// Only the outermost request boundary and [`TenantContextRunner`]
    /// open scopes.
    ///
    /// [`TenantContextRunner`]: super::TenantContextRunner
    pub(crate) async fn scope<F: Future>(fut: F) -> F::Output {
        CURRENT_TENANT.scope(Cell::new(None), fut).await
    }

    /// Whether the caller runs inside a unit of work.
    #[must_use]
    pub fn in_unit_of_work() -> bool {
        CURRENT_TENANT.try_with(|_| ()).is_ok()
    }

    /// Sets the tenant for the current unit of work.
    ///
    /// # Errors
    ///
    /// [`TenantContextError::AlreadySet`] if a tenant is already present,
    /// [`TenantContextError::NoUnitOfWork`] outside a scope.
    pub fn set(tenant: TenantId) -> Result<(), TenantContextError> {
        let outcome = CURRENT_TENANT
            .try_with(|slot| {
                if slot.get().is_some() {
                    return Err(TenantContextError::AlreadySet);
                }
                slot.set(Some(tenant));
                Ok(())
            })
            .unwrap_or(Err(TenantContextError::NoUnitOfWork));

        if let Err(err) = outcome {
            error!(target: SECURITY_TARGET, error = %err, "refused to set tenant context");
        }
        outcome
    }

    /// The current tenant, or `None` when unset or outside a unit of work.
    #[must_use]
    pub fn get() -> Option<TenantId> {
        CURRENT_TENANT.try_with(Cell::get).ok().flatten()
    }

    /// The current tenant, or [`TenantContextError::Missing`].
    ///
    /// # Errors
    ///
    /// Returns [`TenantContextError::Missing`] when no tenant is set.
    pub fn require() -> Result<TenantId, TenantContextError> {
        Self::get().ok_or(TenantContextError::Missing)
    }

    /// Empties the slot. A no-op outside a unit of work.
    pub fn clear() {
        let _ = CURRENT_TENANT.try_with(|slot| slot.set(None));
    }

    /// Sets the tenant and returns a guard that clears it on drop.
    ///
    /// # Errors
    ///
    /// Same as [`TenantContextStore::set`].
    pub fn enter(tenant: TenantId) -> Result<TenantContextGuard, TenantContextError> {
        Self::set(tenant)?;
        Ok(TenantContextGuard { _private: () })
    }
}

/// Clears the tenant slot when dropped.
#[derive(Debug)]
#[must_use = "the tenant context is cleared as soon as the guard is dropped"]
pub struct TenantContextGuard {
    _private: (),
}

impl Drop for TenantContextGuard {
    fn drop(&mut self) {
        TenantContextStore::clear();
    }
}
