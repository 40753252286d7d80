//! The two authentication pipelines.
//!
//! Each pipeline owns its codec, its resolver, and produces its own principal
//! type. Neither holds a reference to the other.

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use tracing::debug;
use vigil_core::{AdminClaims, AdminPrincipal, Domain, TenantClaims, TenantUserPrincipal};

use super::codec::{CodecError, TokenCodec};
use super::error::AuthError;
use super::resolver::{AdminResolver, ResolveError, TenantResolver};
use super::security::SecurityEvents;

/// What the `Authorization` header carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    Missing,
    Bearer(&'a str),
    /// Present but not a usable bearer credential.
    Unusable(&'a str),
}

/// Extracts the bearer credential from request headers.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Credential<'_> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Credential::Missing;
    };
    let Ok(value) = value.to_str() else {
        return Credential::Unusable("");
    };
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Credential::Bearer(token.trim())
        }
        _ => Credential::Unusable(value),
    }
}

/// Admin-domain pipeline: admin codec + admin resolver.
pub struct AdminPipeline {
    codec: TokenCodec<AdminClaims>,
    resolver: AdminResolver,
    events: Arc<SecurityEvents>,
}

impl AdminPipeline {
    #[must_use]
    pub fn new(
        codec: TokenCodec<AdminClaims>,
        resolver: AdminResolver,
        events: Arc<SecurityEvents>,
    ) -> Self {
        Self {
            codec,
            resolver,
            events,
        }
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec<AdminClaims> {
        &self.codec
    }

    /// Authenticates a request to the admin surface.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`]; each failure is logged as a security event.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AdminPrincipal, AuthError> {
        let (raw, outcome) = match bearer_token(headers) {
            Credential::Missing => (None, Err(ResolveError::NoCredential.into())),
            Credential::Unusable(raw) => (Some(raw), Err(CodecError::Malformed.into())),
            Credential::Bearer(raw) => (Some(raw), self.verify(raw).await),
        };
        match outcome {
            Ok(principal) => {
                if let Some(raw) = raw {
                    self.events.record_success(raw);
                }
                debug!(admin = %principal.id, "admin authenticated");
                Ok(principal)
            }
            Err(err) => {
                self.events.record_failure(Domain::Admin, &err, raw);
                Err(err)
            }
        }
    }

    async fn verify(&self, raw: &str) -> Result<AdminPrincipal, AuthError> {
        let claims = self.codec.decode(raw)?;
        Ok(self.resolver.resolve(&claims).await?)
    }
}

/// Tenant-domain pipeline: tenant codec + tenant resolver.
pub struct TenantPipeline {
    codec: TokenCodec<TenantClaims>,
    resolver: TenantResolver,
    events: Arc<SecurityEvents>,
}

impl TenantPipeline {
    #[must_use]
    pub fn new(
        codec: TokenCodec<TenantClaims>,
        resolver: TenantResolver,
        events: Arc<SecurityEvents>,
    ) -> Self {
        Self {
            codec,
            resolver,
            events,
        }
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec<TenantClaims> {
        &self.codec
    }

    /// Authenticates a request to the staff panel. Only staff roles pass.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`]; each failure is logged as a security event.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
    ) -> Result<TenantUserPrincipal, AuthError> {
        let (raw, outcome) = match bearer_token(headers) {
            Credential::Missing => (None, Err(ResolveError::NoCredential.into())),
            Credential::Unusable(raw) => (Some(raw), Err(CodecError::Malformed.into())),
            Credential::Bearer(raw) => (Some(raw), self.verify(raw).await),
        };
        match outcome {
            Ok(principal) => {
                if let Some(raw) = raw {
                    self.events.record_success(raw);
                }
                debug!(user = %principal.id, role = ?principal.role, "tenant user authenticated");
                Ok(principal)
            }
            Err(err) => {
                self.events.record_failure(Domain::Tenant, &err, raw);
                Err(err)
            }
        }
    }

    async fn verify(&self, raw: &str) -> Result<TenantUserPrincipal, AuthError> {
        let claims = self.codec.decode(raw)?;
        let principal = self.resolver.resolve(&claims).await?;
        if !principal.role.is_staff() {
            return Err(ResolveError::RoleNotPermitted.into());
        }
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use vigil_core::{AdminId, TenantId, TenantRole, UserId, UserStatus};

    use super::*;
    use crate::storage::{unix_now, MemoryDirectory};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn pipelines() -> (AdminPipeline, TenantPipeline) {
        let dir = Arc::new(MemoryDirectory::new());
        dir.add_admin(AdminId::new(7).unwrap(), true);
        dir.add_tenant(TenantId::new(42).unwrap(), "acme", true);
        dir.add_user(
            UserId::new(3).unwrap(),
            TenantId::new(42).unwrap(),
            TenantRole::Responder,
            UserStatus::Active,
        );
        dir.add_user(
            UserId::new(4).unwrap(),
            TenantId::new(42).unwrap(),
            TenantRole::AnonymousChannel,
            UserStatus::Active,
        );
        let events = Arc::new(SecurityEvents::default());
        let admin = AdminPipeline::new(
            TokenCodec::new(b"admin-secret", 30),
            AdminResolver::new(dir.clone(), dir.clone()),
            Arc::clone(&events),
        );
        let tenant = TenantPipeline::new(
            TokenCodec::new(b"tenant-secret", 30),
            TenantResolver::new(dir.clone(), dir.clone(), dir),
            events,
        );
        (admin, tenant)
    }

    fn tenant_token(pipeline: &TenantPipeline, user: i64, role: TenantRole) -> String {
        pipeline
            .codec()
            .encode(&TenantClaims::new(
                UserId::new(user).unwrap(),
                TenantId::new(42).unwrap(),
                role,
                unix_now(),
                600,
            ))
            .unwrap()
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(bearer_token(&HeaderMap::new()), Credential::Missing);
        assert_eq!(bearer_token(&headers("Bearer abc")), Credential::Bearer("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Credential::Bearer("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), Credential::Unusable("Basic abc"));
        assert_eq!(bearer_token(&headers("Bearer ")), Credential::Unusable("Bearer "));
    }

    #[tokio::test]
    async fn each_pipeline_accepts_only_its_own_domain() {
        let (admin, tenant) = pipelines();
        let admin_token = admin
            .codec()
            .encode(&AdminClaims::new(AdminId::new(7).unwrap(), unix_now(), 600))
            .unwrap();
        let responder = tenant_token(&tenant, 3, TenantRole::Responder);

        let ok = admin
            .authenticate(&headers(&format!("Bearer {admin_token}")))
            .await
            .unwrap();
        assert_eq!(ok.id.get(), 7);
        let ok = tenant
            .authenticate(&headers(&format!("Bearer {responder}")))
            .await
            .unwrap();
        assert_eq!(ok.tenant_id.get(), 42);

        let err = admin
            .authenticate(&headers(&format!("Bearer {responder}")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CrossDomainAttempt { .. }));
        assert_eq!(err.kind(), "invalid_token");

        let err = tenant
            .authenticate(&headers(&format!("Bearer {admin_token}")))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CrossDomainAttempt { .. }));
    }

    #[tokio::test]
    async fn missing_credential_is_not_resolvable() {
        let (admin, tenant) = pipelines();
        assert!(matches!(
            admin.authenticate(&HeaderMap::new()).await,
            Err(AuthError::PrincipalNotResolvable(ResolveError::NoCredential))
        ));
        assert!(matches!(
            tenant.authenticate(&HeaderMap::new()).await,
            Err(AuthError::PrincipalNotResolvable(ResolveError::NoCredential))
        ));
    }

    #[tokio::test]
    async fn unusable_header_is_invalid_token() {
        let (_, tenant) = pipelines();
        let err = tenant.authenticate(&headers("Basic Zm9vOmJhcg==")).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_token");
    }

    #[tokio::test]
    async fn anonymous_channel_role_cannot_open_the_panel() {
        let (_, tenant) = pipelines();
        let token = tenant_token(&tenant, 4, TenantRole::AnonymousChannel);
        assert!(matches!(
            tenant.authenticate(&headers(&format!("Bearer {token}"))).await,
            Err(AuthError::PrincipalNotResolvable(ResolveError::RoleNotPermitted))
        ));
    }
}
