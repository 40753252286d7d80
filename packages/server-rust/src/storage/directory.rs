//! In-memory platform registries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use vigil_core::{
    ActivationTokens, AdminAccount, AdminDirectory, AdminId, Domain, MessageLedger,
    RevocationList, TenantDirectory, TenantId, TenantRecord, TenantRole, UserAccount,
    UserDirectory, UserId, UserStatus,
};

/// Every platform registry in one in-memory value.
///
/// Implements all collaborator traits so the server can be wired from a
/// single `Arc<MemoryDirectory>`; a production deployment substitutes real
/// adapters per trait.
#[derive(Debug)]
pub struct MemoryDirectory {
    admins: DashMap<AdminId, AdminAccount>,
    tenants: DashMap<TenantId, TenantRecord>,
    users: DashMap<UserId, UserAccount>,
    /// `(domain, subject) -> cutoff`: credentials issued at or before the
    /// cutoff are revoked.
    revocations: DashMap<(Domain, i64), i64>,
    activation_tokens: Mutex<HashMap<String, UserId>>,
    authored: DashMap<UserId, u64>,
    next_user_id: AtomicI64,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            admins: DashMap::new(),
            tenants: DashMap::new(),
            users: DashMap::new(),
            revocations: DashMap::new(),
            activation_tokens: Mutex::new(HashMap::new()),
            authored: DashMap::new(),
            next_user_id: AtomicI64::new(1),
        }
    }

    pub fn add_admin(&self, id: AdminId, active: bool) {
        self.admins.insert(id, AdminAccount { id, active });
    }

    pub fn add_tenant(&self, id: TenantId, name: &str, active: bool) {
        self.tenants.insert(
            id,
            TenantRecord {
                id,
                name: name.to_string(),
                active,
            },
        );
    }

    /// Inserts a user with an explicit id and status, keeping the id
    /// allocator ahead of it.
    pub fn add_user(
        &self,
        id: UserId,
        tenant_id: TenantId,
        role: TenantRole,
        status: UserStatus,
    ) {
        self.next_user_id.fetch_max(id.get() + 1, Ordering::Relaxed);
        self.users.insert(
            id,
            UserAccount {
                id,
                tenant_id,
                email: format!("user{id}@tenant{tenant_id}.example"),
                role,
                status,
            },
        );
    }

    /// Revokes every credential of `subject` issued at or before `cutoff`.
    pub fn revoke(&self, domain: Domain, subject: i64, cutoff: i64) {
        self.revocations.insert((domain, subject), cutoff);
    }

    /// Registers a one-time activation token for `user`.
    pub fn issue_activation(&self, token: &str, user: UserId) {
        self.activation_tokens.lock().insert(token.to_string(), user);
    }

    /// Records that `user` authored a case message.
    pub fn record_message(&self, user: UserId) {
        *self.authored.entry(user).or_insert(0) += 1;
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminDirectory for MemoryDirectory {
    async fn find_admin(&self, id: AdminId) -> anyhow::Result<Option<AdminAccount>> {
        Ok(self.admins.get(&id).map(|a| a.value().clone()))
    }
}

#[async_trait]
impl TenantDirectory for MemoryDirectory {
    async fn find_tenant(&self, id: TenantId) -> anyhow::Result<Option<TenantRecord>> {
        Ok(self.tenants.get(&id).map(|t| t.value().clone()))
    }

    async fn list_active_tenants(&self) -> anyhow::Result<Vec<TenantId>> {
        let mut ids: Vec<TenantId> = self
            .tenants
            .iter()
            .filter(|t| t.active)
            .map(|t| *t.key())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_user(&self, id: UserId) -> anyhow::Result<Option<UserAccount>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn list_users(&self, tenant: Option<TenantId>) -> anyhow::Result<Vec<UserAccount>> {
        let mut users: Vec<UserAccount> = self
            .users
            .iter()
            .filter(|u| tenant.is_none_or(|t| u.tenant_id == t))
            .map(|u| u.value().clone())
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn allocate_user_id(&self) -> anyhow::Result<UserId> {
        Ok(UserId::new(self.next_user_id.fetch_add(1, Ordering::Relaxed))?)
    }

    async fn save_user(&self, account: &UserAccount) -> anyhow::Result<()> {
        self.users.insert(account.id, account.clone());
        Ok(())
    }

    async fn count_managers(&self, tenant: TenantId, status: UserStatus) -> anyhow::Result<u64> {
        let count = self
            .users
            .iter()
            .filter(|u| u.tenant_id == tenant && u.role == TenantRole::Manager && u.status == status)
            .count();
        Ok(u64::try_from(count)?)
    }
}

#[async_trait]
impl RevocationList for MemoryDirectory {
    async fn is_revoked(
        &self,
        domain: Domain,
        subject: i64,
        issued_at: i64,
    ) -> anyhow::Result<bool> {
        Ok(self
            .revocations
            .get(&(domain, subject))
            .is_some_and(|cutoff| issued_at <= *cutoff))
    }
}

#[async_trait]
impl ActivationTokens for MemoryDirectory {
    async fn consume(&self, token: &str) -> anyhow::Result<Option<UserId>> {
        Ok(self.activation_tokens.lock().remove(token))
    }
}

#[async_trait]
impl MessageLedger for MemoryDirectory {
    async fn authored_count(&self, user: UserId) -> anyhow::Result<u64> {
        Ok(self.authored.get(&user).map_or(0, |c| *c))
    }
}
