//! Credential claim schemas for the two authentication domains.
//!
//! The admin and tenant schemas are deliberately disjoint: both reject
//! unknown fields, the admin schema has no tenant field, and each carries its
//! own audience. A token minted for one domain therefore fails schema
//! validation in the other, independently of which secret signed it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{AdminId, AdminRole, Domain, TenantId, TenantRole, UserId};

impl Domain {
    /// Audience (`aud`) value every token of this domain must carry.
    #[must_use]
    pub fn audience(self) -> &'static str {
        match self {
            Self::Admin => "vigil-admin",
            Self::Tenant => "vigil-tenant",
        }
    }

    /// JOSE header `typ` stamped on tokens of this domain.
    #[must_use]
    pub fn token_type(self) -> &'static str {
        match self {
            Self::Admin => "admin+jwt",
            Self::Tenant => "tenant+jwt",
        }
    }

    /// Inverse of [`Domain::token_type`].
    #[must_use]
    pub fn from_token_type(typ: &str) -> Option<Self> {
        match typ {
            "admin+jwt" => Some(Self::Admin),
            "tenant+jwt" => Some(Self::Tenant),
            _ => None,
        }
    }
}

/// Common surface of a domain's claim schema.
pub trait DomainClaims: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The domain this schema belongs to.
    const DOMAIN: Domain;

    /// Issued-at, seconds since the Unix epoch.
    fn issued_at(&self) -> i64;

    /// Expiry, seconds since the Unix epoch.
    fn expires_at(&self) -> i64;
}

/// Claims of a platform administrator credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminClaims {
    pub sub: AdminId,
    pub role: AdminRole,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

impl AdminClaims {
    /// Builds claims valid from `issued_at` for `ttl_secs` seconds.
    #[must_use]
    pub fn new(sub: AdminId, issued_at: i64, ttl_secs: i64) -> Self {
        Self {
            sub,
            role: AdminRole::Administrator,
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_secs),
            aud: Domain::Admin.audience().to_string(),
        }
    }
}

impl DomainClaims for AdminClaims {
    const DOMAIN: Domain = Domain::Admin;

    fn issued_at(&self) -> i64 {
        self.iat
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Claims of a tenant user credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantClaims {
    pub sub: UserId,
    #[serde(rename = "tenantId")]
    pub tenant_id: TenantId,
    pub role: TenantRole,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

impl TenantClaims {
    /// Builds claims valid from `issued_at` for `ttl_secs` seconds.
    #[must_use]
    pub fn new(
        sub: UserId,
        tenant_id: TenantId,
        role: TenantRole,
        issued_at: i64,
        ttl_secs: i64,
    ) -> Self {
        Self {
            sub,
            tenant_id,
            role,
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_secs),
            aud: Domain::Tenant.audience().to_string(),
        }
    }
}

impl DomainClaims for TenantClaims {
    const DOMAIN: Domain = Domain::Tenant;

    fn issued_at(&self) -> i64 {
        self.iat
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}
