use std::fmt;

use anyhow::ensure;

/// Authentication and path-partition configuration.
///
/// `Debug` redacts both secrets.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for admin-domain credentials.
    pub admin_secret: String,
    /// HMAC secret for tenant-domain credentials. Must differ from
    /// `admin_secret`.
    pub tenant_secret: String,
    /// Tolerated clock skew when checking `exp` and `iat`, in seconds.
    pub clock_skew_secs: u64,
    /// Lifetime of credentials minted by this process, in seconds.
    pub token_ttl_secs: i64,
    /// Paths under this prefix go to the admin pipeline; all others go to
    /// the tenant pipeline.
    pub admin_prefix: String,
    /// Tenant-domain prefixes where the principal is forced to Anonymous.
    pub anonymous_prefixes: Vec<String>,
    /// Tenant-domain prefixes that need no principal.
    pub public_prefixes: Vec<String>,
    /// Failed attempts per credential fingerprint before a security warning.
    pub failure_warn_threshold: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_secret: String::new(),
            tenant_secret: String::new(),
            clock_skew_secs: 30,
            token_ttl_secs: 3_600,
            admin_prefix: "/api/admin".to_string(),
            anonymous_prefixes: vec!["/api/alert".to_string()],
            public_prefixes: vec![
                "/health".to_string(),
                "/static".to_string(),
                "/api/auth/activate".to_string(),
            ],
            failure_warn_threshold: 5,
        }
    }
}

impl AuthConfig {
    /// Rejects configurations that would weaken the domain split.
    ///
    /// # Errors
    ///
    /// Returns an error if a secret is empty, both secrets are equal, or a
    /// prefix is not an absolute path without trailing slash.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.admin_secret.is_empty(), "admin secret must not be empty");
        ensure!(!self.tenant_secret.is_empty(), "tenant secret must not be empty");
        ensure!(
            self.admin_secret != self.tenant_secret,
            "admin and tenant secrets must differ"
        );
        ensure!(self.token_ttl_secs > 0, "token ttl must be positive");
        for prefix in std::iter::once(&self.admin_prefix)
            .chain(&self.anonymous_prefixes)
            .chain(&self.public_prefixes)
        {
            ensure!(
                prefix.starts_with('/') && prefix.len() > 1 && !prefix.ends_with('/'),
                "invalid path prefix {prefix:?}"
            );
        }
        Ok(())
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_secret", &"<redacted>")
            .field("tenant_secret", &"<redacted>")
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("admin_prefix", &self.admin_prefix)
            .field("anonymous_prefixes", &self.anonymous_prefixes)
            .field("public_prefixes", &self.public_prefixes)
            .field("failure_warn_threshold", &self.failure_warn_threshold)
            .finish()
    }
}
