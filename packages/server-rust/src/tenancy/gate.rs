//! Tenant-scoped data gate.
//!
//! Sits between business code and the persistence adapters. The current
//! tenant is read from the unit-of-work context at the moment each call
//! crosses the data-access boundary, never earlier, so a gate constructed at
//! startup (or a handler entered before authentication finished) cannot lock
//! onto a stale or absent tenant.

use std::sync::Arc;

use tracing::{error, warn};
use uuid::Uuid;
use vigil_core::{CaseId, CaseStatus, TenantId};

use super::store::{TenantContextError, TenantContextStore};
use crate::auth::security::SECURITY_TARGET;
use crate::storage::{CaseRecord, CaseRepository, NewCase};

/// Rows that belong to exactly one tenant.
pub trait TenantOwned {
    fn tenant_id(&self) -> TenantId;
}

/// Failures at the data-access boundary.
#[derive(Debug, thiserror::Error)]
pub enum DataGateError {
    /// No tenant context is active; nothing was sent to storage.
    #[error("tenant-scoped {operation} refused: no tenant context")]
    TenantContextMissing { operation: &'static str },
    /// The adapter returned a row of a different tenant. The result is
    /// discarded.
    #[error("storage returned a foreign-tenant row during {operation}")]
    ForeignRow { operation: &'static str },
    #[error("storage failure during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Context(#[from] TenantContextError),
}

/// Injects the current tenant into every persistence call.
///
/// The adapter is handed in at construction; the gate holds no tenant state
/// of its own and can be shared across all requests.
pub struct TenantScopedDataGate<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for TenantScopedDataGate<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ?Sized> TenantScopedDataGate<S> {
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolves the tenant for one boundary crossing.
    fn current(operation: &'static str) -> Result<TenantId, DataGateError> {
        TenantContextStore::get().ok_or_else(|| {
            warn!(
                target: SECURITY_TARGET,
                operation, "tenant-scoped data access attempted without tenant context"
            );
            DataGateError::TenantContextMissing { operation }
        })
    }
}

fn storage_err(operation: &'static str) -> impl FnOnce(anyhow::Error) -> DataGateError {
    move |source| DataGateError::Storage { operation, source }
}

fn ensure_owned<R: TenantOwned>(
    tenant: TenantId,
    row: R,
    operation: &'static str,
) -> Result<R, DataGateError> {
    if row.tenant_id() == tenant {
        Ok(row)
    } else {
        error!(
            target: SECURITY_TARGET,
            operation, "persistence adapter leaked a foreign-tenant row"
        );
        Err(DataGateError::ForeignRow { operation })
    }
}

impl<S: CaseRepository + ?Sized> TenantScopedDataGate<S> {
    /// Cases of the current tenant.
    ///
    /// # Errors
    ///
    /// See [`DataGateError`].
    pub async fn list_cases(&self) -> Result<Vec<CaseRecord>, DataGateError> {
        const OP: &str = "list_cases";
        let tenant = Self::current(OP)?;
        let rows = self.store.list(tenant).await.map_err(storage_err(OP))?;
        rows.into_iter()
            .map(|row| ensure_owned(tenant, row, OP))
            .collect()
    }

    /// One case of the current tenant.
    ///
    /// # Errors
    ///
    /// See [`DataGateError`].
    pub async fn find_case(&self, id: CaseId) -> Result<Option<CaseRecord>, DataGateError> {
        const OP: &str = "find_case";
        let tenant = Self::current(OP)?;
        let row = self.store.find(tenant, id).await.map_err(storage_err(OP))?;
        row.map(|row| ensure_owned(tenant, row, OP)).transpose()
    }

    /// One case of the current tenant by tracking id.
    ///
    /// # Errors
    ///
    /// See [`DataGateError`].
    pub async fn find_case_by_tracking(
        &self,
        tracking_id: Uuid,
    ) -> Result<Option<CaseRecord>, DataGateError> {
        const OP: &str = "find_case_by_tracking";
        let tenant = Self::current(OP)?;
        let row = self
            .store
            .find_by_tracking(tenant, tracking_id)
            .await
            .map_err(storage_err(OP))?;
        row.map(|row| ensure_owned(tenant, row, OP)).transpose()
    }

    /// Stores a case under the current tenant.
    ///
    /// # Errors
    ///
    /// See [`DataGateError`].
    pub async fn insert_case(&self, draft: NewCase) -> Result<CaseRecord, DataGateError> {
        const OP: &str = "insert_case";
        let tenant = Self::current(OP)?;
        let row = self.store.insert(tenant, draft).await.map_err(storage_err(OP))?;
        ensure_owned(tenant, row, OP)
    }

    /// Changes a case status within the current tenant.
    ///
    /// # Errors
    ///
    /// See [`DataGateError`].
    pub async fn update_case_status(
        &self,
        id: CaseId,
        status: CaseStatus,
        now: i64,
    ) -> Result<Option<CaseRecord>, DataGateError> {
        const OP: &str = "update_case_status";
        let tenant = Self::current(OP)?;
        let row = self
            .store
            .update_status(tenant, id, status, now)
            .await
            .map_err(storage_err(OP))?;
        row.map(|row| ensure_owned(tenant, row, OP)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::storage::MemoryCaseStore;
    use crate::tenancy::TenantContextRunner;

    fn tenant(id: i64) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn draft(title: &str) -> NewCase {
        NewCase {
            title: title.to_string(),
            body: String::new(),
            created_at: 0,
        }
    }

    /// Adapter that ignores the tenant argument and always answers with
    /// tenant 999's rows.
    struct LeakyRepository {
        calls: AtomicU64,
    }

    #[async_trait]
    impl CaseRepository for LeakyRepository {
        async fn list(&self, _tenant: TenantId) -> anyhow::Result<Vec<CaseRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CaseRecord {
                id: CaseId::new(1)?,
                tenant_id: TenantId::new(999)?,
                tracking_id: Uuid::nil(),
                title: "foreign".to_string(),
                body: String::new(),
                status: CaseStatus::New,
                created_at: 0,
                updated_at: 0,
            }])
        }
        async fn find(&self, _: TenantId, _: CaseId) -> anyhow::Result<Option<CaseRecord>> {
            Ok(None)
        }
        async fn find_by_tracking(&self, _: TenantId, _: Uuid) -> anyhow::Result<Option<CaseRecord>> {
            Ok(None)
        }
        async fn insert(&self, _: TenantId, _: NewCase) -> anyhow::Result<CaseRecord> {
            anyhow::bail!("read-only")
        }
        async fn update_status(
            &self,
            _: TenantId,
            _: CaseId,
            _: CaseStatus,
            _: i64,
        ) -> anyhow::Result<Option<CaseRecord>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn refuses_without_context_and_never_touches_storage() {
        let store = Arc::new(MemoryCaseStore::new());
        let gate = TenantScopedDataGate::new(Arc::clone(&store));

        let err = gate.list_cases().await.unwrap_err();
        assert!(matches!(
            err,
            DataGateError::TenantContextMissing { operation: "list_cases" }
        ));
        assert!(gate.insert_case(draft("x")).await.is_err());

        // Inside a unit of work that never set a tenant: same refusal.
        let inside = TenantContextStore::scope(gate.list_cases()).await;
        assert!(matches!(inside, Err(DataGateError::TenantContextMissing { .. })));

        assert_eq!(store.access_count(), 0);
    }

    #[tokio::test]
    async fn queries_are_scoped_to_the_current_tenant() {
        let store = Arc::new(MemoryCaseStore::new());
        let gate = TenantScopedDataGate::new(Arc::clone(&store));
        let runner = TenantContextRunner::new();

        let a = runner
            .run_as(tenant(1), || gate.insert_case(draft("a")))
            .await
            .unwrap();
        runner
            .run_as(tenant(2), || gate.insert_case(draft("b")))
            .await
            .unwrap();

        let seen_by_2 = runner.run_as(tenant(2), || gate.list_cases()).await.unwrap();
        assert_eq!(seen_by_2.len(), 1);
        assert_eq!(seen_by_2[0].title, "b");

        let cross = runner
            .run_as(tenant(2), || gate.find_case(a.id))
            .await
            .unwrap();
        assert!(cross.is_none());
    }

    #[tokio::test]
    async fn tenant_is_resolved_per_call_not_at_construction() {
        let store = Arc::new(MemoryCaseStore::new());
        // Built before any unit of work exists.
        let gate = TenantScopedDataGate::new(Arc::clone(&store));
        let runner = TenantContextRunner::new();

        for id in [3, 4] {
            runner
                .run_as(tenant(id), || gate.insert_case(draft("c")))
                .await
                .unwrap();
        }
        let third = runner.run_as(tenant(3), || gate.list_cases()).await.unwrap();
        let fourth = runner.run_as(tenant(4), || gate.list_cases()).await.unwrap();
        assert_eq!(third[0].tenant_id, tenant(3));
        assert_eq!(fourth[0].tenant_id, tenant(4));
    }

    #[tokio::test]
    async fn foreign_rows_from_the_adapter_are_rejected() {
        let repo = Arc::new(LeakyRepository {
            calls: AtomicU64::new(0),
        });
        let gate = TenantScopedDataGate::new(Arc::clone(&repo));
        let err = TenantContextRunner::new()
            .run_as(tenant(1), || gate.list_cases())
            .await
            .unwrap_err();
        assert!(matches!(err, DataGateError::ForeignRow { operation: "list_cases" }));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    }
}
