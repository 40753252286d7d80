//! Claims -> principal resolution, one resolver per domain.
//!
//! Resolution re-reads the directories on every request: principals are
//! owned by the request and never cached.

use std::sync::Arc;

use vigil_core::{
    AdminClaims, AdminDirectory, AdminPrincipal, Domain, RevocationList, TenantClaims,
    TenantDirectory, TenantUserPrincipal, UserDirectory, UserStatus,
};

/// Why decoded claims did not yield a principal.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no credential presented")]
    NoCredential,
    #[error("subject not found")]
    UserNotFound,
    #[error("subject is not active")]
    UserNotActive,
    #[error("credential revoked")]
    Revoked,
    #[error("subject does not belong to the claimed tenant")]
    TenantMismatch,
    #[error("tenant not found")]
    TenantNotFound,
    #[error("tenant is not active")]
    TenantNotActive,
    #[error("role may not use this surface")]
    RoleNotPermitted,
    #[error("directory lookup failed: {0}")]
    Directory(#[from] anyhow::Error),
}

/// Resolves admin claims against the admin directory.
pub struct AdminResolver {
    admins: Arc<dyn AdminDirectory>,
    revocations: Arc<dyn RevocationList>,
}

impl AdminResolver {
    #[must_use]
    pub fn new(admins: Arc<dyn AdminDirectory>, revocations: Arc<dyn RevocationList>) -> Self {
        Self {
            admins,
            revocations,
        }
    }

    /// # Errors
    ///
    /// `UserNotFound`, `UserNotActive`, `Revoked`, or `Directory`.
    pub async fn resolve(&self, claims: &AdminClaims) -> Result<AdminPrincipal, ResolveError> {
        let admin = self
            .admins
            .find_admin(claims.sub)
            .await?
            .ok_or(ResolveError::UserNotFound)?;
        if !admin.active {
            return Err(ResolveError::UserNotActive);
        }
        if self
            .revocations
            .is_revoked(Domain::Admin, claims.sub.get(), claims.iat)
            .await?
        {
            return Err(ResolveError::Revoked);
        }
        Ok(AdminPrincipal { id: admin.id })
    }
}

/// Resolves tenant claims against the user and tenant directories.
pub struct TenantResolver {
    users: Arc<dyn UserDirectory>,
    tenants: Arc<dyn TenantDirectory>,
    revocations: Arc<dyn RevocationList>,
}

impl TenantResolver {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        tenants: Arc<dyn TenantDirectory>,
        revocations: Arc<dyn RevocationList>,
    ) -> Self {
        Self {
            users,
            tenants,
            revocations,
        }
    }

    /// Checks that the user exists and is active, still belongs to the
    /// claimed tenant, that the tenant exists and is active, and that the
    /// credential is not revoked. The role is taken from the directory, not
    /// from the claims.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`] except `NoCredential` and `RoleNotPermitted`.
    pub async fn resolve(&self, claims: &TenantClaims) -> Result<TenantUserPrincipal, ResolveError> {
        let user = self
            .users
            .find_user(claims.sub)
            .await?
            .ok_or(ResolveError::UserNotFound)?;
        if user.status != UserStatus::Active {
            return Err(ResolveError::UserNotActive);
        }
        if user.tenant_id != claims.tenant_id {
            return Err(ResolveError::TenantMismatch);
        }

        let tenant = self
            .tenants
            .find_tenant(claims.tenant_id)
            .await?
            .ok_or(ResolveError::TenantNotFound)?;
        if !tenant.active {
            return Err(ResolveError::TenantNotActive);
        }

        if self
            .revocations
            .is_revoked(Domain::Tenant, claims.sub.get(), claims.iat)
            .await?
        {
            return Err(ResolveError::Revoked);
        }

        Ok(TenantUserPrincipal {
            id: user.id,
            tenant_id: tenant.id,
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::{AdminId, TenantId, TenantRole, UserId};

    use super::*;
    use crate::storage::MemoryDirectory;

    fn tenant(id: i64) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn tenant_resolver(dir: &Arc<MemoryDirectory>) -> TenantResolver {
        TenantResolver::new(dir.clone(), dir.clone(), dir.clone())
    }

    fn claims(sub: i64, tenant_id: i64) -> TenantClaims {
        TenantClaims::new(user(sub), tenant(tenant_id), TenantRole::Manager, 1_000, 600)
    }

    fn seeded() -> Arc<MemoryDirectory> {
        let dir = Arc::new(MemoryDirectory::new());
        dir.add_tenant(tenant(42), "acme", true);
        dir.add_tenant(tenant(43), "dormant", false);
        dir.add_user(user(3), tenant(42), TenantRole::Responder, UserStatus::Active);
        dir.add_user(user(4), tenant(42), TenantRole::Responder, UserStatus::Suspended);
        dir.add_user(user(5), tenant(43), TenantRole::Responder, UserStatus::Active);
        dir
    }

    #[tokio::test]
    async fn resolves_active_user_with_directory_role() {
        let dir = seeded();
        let principal = tenant_resolver(&dir).resolve(&claims(3, 42)).await.unwrap();
        assert_eq!(
            principal,
            TenantUserPrincipal {
                id: user(3),
                tenant_id: tenant(42),
                role: TenantRole::Responder,
            }
        );
    }

    #[tokio::test]
    async fn rejects_unknown_inactive_and_mismatched_subjects() {
        let dir = seeded();
        let resolver = tenant_resolver(&dir);
        assert!(matches!(
            resolver.resolve(&claims(99, 42)).await,
            Err(ResolveError::UserNotFound)
        ));
        assert!(matches!(
            resolver.resolve(&claims(4, 42)).await,
            Err(ResolveError::UserNotActive)
        ));
        assert!(matches!(
            resolver.resolve(&claims(3, 43)).await,
            Err(ResolveError::TenantMismatch)
        ));
        assert!(matches!(
            resolver.resolve(&claims(5, 43)).await,
            Err(ResolveError::TenantNotActive)
        ));
    }

    #[tokio::test]
    async fn revoked_tenant_credential_is_rejected() {
        let dir = seeded();
        dir.revoke(Domain::Tenant, 3, 1_000);
        assert!(matches!(
            tenant_resolver(&dir).resolve(&claims(3, 42)).await,
            Err(ResolveError::Revoked)
        ));
    }

    #[tokio::test]
    async fn admin_resolution_checks_activity_and_revocation() {
        let dir = Arc::new(MemoryDirectory::new());
        dir.add_admin(AdminId::new(7).unwrap(), true);
        dir.add_admin(AdminId::new(8).unwrap(), false);
        let resolver = AdminResolver::new(dir.clone(), dir.clone());

        let ok = resolver
            .resolve(&AdminClaims::new(AdminId::new(7).unwrap(), 1_000, 60))
            .await
            .unwrap();
        assert_eq!(ok.id.get(), 7);

        assert!(matches!(
            resolver
                .resolve(&AdminClaims::new(AdminId::new(8).unwrap(), 1_000, 60))
                .await,
            Err(ResolveError::UserNotActive)
        ));

        dir.revoke(Domain::Admin, 7, 2_000);
        assert!(matches!(
            resolver
                .resolve(&AdminClaims::new(AdminId::new(7).unwrap(), 1_000, 60))
                .await,
            Err(ResolveError::Revoked)
        ));
    }
}
