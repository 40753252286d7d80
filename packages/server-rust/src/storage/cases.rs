//! Tenant-partitioned case storage.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;
use vigil_core::{CaseId, CaseStatus, TenantId};

use crate::tenancy::TenantOwned;

/// A stored case (whistleblower report).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    pub id: CaseId,
    #[serde(skip)]
    pub tenant_id: TenantId,
    /// Opaque reference handed to the reporter for status lookups.
    #[serde(skip)]
    pub tracking_id: Uuid,
    pub title: String,
    pub body: String,
    pub status: CaseStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TenantOwned for CaseRecord {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Input for a new case.
#[derive(Debug, Clone)]
pub struct NewCase {
    pub title: String,
    pub body: String,
    pub created_at: i64,
}

/// Persistence adapter for cases. The tenant is always an explicit argument;
/// implementations must filter every read and write by it.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// All cases of `tenant`, oldest first.
    async fn list(&self, tenant: TenantId) -> anyhow::Result<Vec<CaseRecord>>;

    /// One case of `tenant`.
    async fn find(&self, tenant: TenantId, id: CaseId) -> anyhow::Result<Option<CaseRecord>>;

    /// One case of `tenant` by its reporter-facing tracking id.
    async fn find_by_tracking(
        &self,
        tenant: TenantId,
        tracking_id: Uuid,
    ) -> anyhow::Result<Option<CaseRecord>>;

    /// Store a new case under `tenant`.
    async fn insert(&self, tenant: TenantId, draft: NewCase) -> anyhow::Result<CaseRecord>;

    /// Change the status of one case of `tenant`. `None` if it does not exist.
    async fn update_status(
        &self,
        tenant: TenantId,
        id: CaseId,
        status: CaseStatus,
        now: i64,
    ) -> anyhow::Result<Option<CaseRecord>>;
}

/// [`CaseRepository`] backed by a [`DashMap`] keyed by tenant.
#[derive(Debug)]
pub struct MemoryCaseStore {
    partitions: DashMap<TenantId, Vec<CaseRecord>>,
    next_id: AtomicI64,
    accesses: AtomicU64,
}

impl MemoryCaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            partitions: DashMap::new(),
            next_id: AtomicI64::new(1),
            accesses: AtomicU64::new(0),
        }
    }

    /// Number of repository calls served so far.
    #[must_use]
    pub fn access_count(&self) -> u64 {
        self.accesses.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        self.accesses.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for MemoryCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaseRepository for MemoryCaseStore {
    async fn list(&self, tenant: TenantId) -> anyhow::Result<Vec<CaseRecord>> {
        self.touch();
        Ok(self
            .partitions
            .get(&tenant)
            .map(|cases| cases.value().clone())
            .unwrap_or_default())
    }

    async fn find(&self, tenant: TenantId, id: CaseId) -> anyhow::Result<Option<CaseRecord>> {
        self.touch();
        Ok(self
            .partitions
            .get(&tenant)
            .and_then(|cases| cases.iter().find(|c| c.id == id).cloned()))
    }

    async fn find_by_tracking(
        &self,
        tenant: TenantId,
        tracking_id: Uuid,
    ) -> anyhow::Result<Option<CaseRecord>> {
        self.touch();
        Ok(self
            .partitions
            .get(&tenant)
            .and_then(|cases| cases.iter().find(|c| c.tracking_id == tracking_id).cloned()))
    }

    async fn insert(&self, tenant: TenantId, draft: NewCase) -> anyhow::Result<CaseRecord> {
        self.touch();
        let id = CaseId::new(self.next_id.fetch_add(1, Ordering::Relaxed))?;
        let record = CaseRecord {
            id,
            tenant_id: tenant,
            tracking_id: Uuid::new_v4(),
            title: draft.title,
            body: draft.body,
            status: CaseStatus::New,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        };
        self.partitions.entry(tenant).or_default().push(record.clone());
        Ok(record)
    }

    async fn update_status(
        &self,
        tenant: TenantId,
        id: CaseId,
        status: CaseStatus,
        now: i64,
    ) -> anyhow::Result<Option<CaseRecord>> {
        self.touch();
        let Some(mut cases) = self.partitions.get_mut(&tenant) else {
            return Ok(None);
        };
        Ok(cases.iter_mut().find(|c| c.id == id).map(|case| {
            case.status = status;
            case.updated_at = now;
            case.clone()
        }))
    }
}
