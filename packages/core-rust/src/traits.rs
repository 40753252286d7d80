use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::lifecycle::{UserAccount, UserStatus};
use crate::types::{AdminId, Domain, TenantId, UserId};

/// A platform administrator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub id: AdminId,
    pub active: bool,
}

/// A tenant (company) as the platform registry stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: TenantId,
    pub name: String,
    pub active: bool,
}

/// Lookup of platform administrators. Never consulted by the tenant pipeline.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Find an administrator by id.
    async fn find_admin(&self, id: AdminId) -> anyhow::Result<Option<AdminAccount>>;
}

/// Tenant user accounts across all tenants.
///
/// This is a platform-level registry: it is consulted during authentication
/// (before any tenant context exists) and by admin operations, so it is not
/// routed through the tenant-scoped data gate.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by id, in any tenant and any state.
    async fn find_user(&self, id: UserId) -> anyhow::Result<Option<UserAccount>>;

    /// List users, optionally restricted to one tenant.
    async fn list_users(&self, tenant: Option<TenantId>) -> anyhow::Result<Vec<UserAccount>>;

    /// Reserve a fresh user id.
    async fn allocate_user_id(&self) -> anyhow::Result<UserId>;

    /// Insert or replace an account.
    async fn save_user(&self, account: &UserAccount) -> anyhow::Result<()>;

    /// Number of users in `tenant` holding the Manager role with `status`.
    async fn count_managers(&self, tenant: TenantId, status: UserStatus) -> anyhow::Result<u64>;
}

/// Registry of tenants.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Find a tenant by id.
    async fn find_tenant(&self, id: TenantId) -> anyhow::Result<Option<TenantRecord>>;

    /// All tenants currently marked active.
    async fn list_active_tenants(&self) -> anyhow::Result<Vec<TenantId>>;
}

/// Credential revocation, keyed by domain and subject.
#[async_trait]
pub trait RevocationList: Send + Sync {
    /// Whether a credential for `subject` issued at `issued_at` (epoch
    /// seconds) has been revoked.
    async fn is_revoked(&self, domain: Domain, subject: i64, issued_at: i64)
        -> anyhow::Result<bool>;
}

/// One-time activation/reset tokens. Issuance and delivery happen elsewhere;
/// this side only consumes.
#[async_trait]
pub trait ActivationTokens: Send + Sync {
    /// Consume `token`, returning the user it was issued for. A token can be
    /// consumed at most once.
    async fn consume(&self, token: &str) -> anyhow::Result<Option<UserId>>;
}

/// Authorship records for case messages.
#[async_trait]
pub trait MessageLedger: Send + Sync {
    /// Number of messages authored by `user`.
    async fn authored_count(&self, user: UserId) -> anyhow::Result<u64>;
}
