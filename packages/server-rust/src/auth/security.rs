//! Security event logging.
//!
//! Authentication failures are logged under [`SECURITY_TARGET`]. Raw
//! credentials never reach the log: failures are keyed by a short SHA-256
//! fingerprint, and a credential that keeps failing escalates from `info` to
//! `warn` once it reaches the configured threshold.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use vigil_core::Domain;

use super::error::AuthError;

/// `tracing` target for security-relevant events.
pub const SECURITY_TARGET: &str = "vigil::security";

/// Upper bound on tracked fingerprints; the table is reset when exceeded.
const MAX_TRACKED: usize = 10_000;

/// Counts repeated authentication failures per credential fingerprint.
#[derive(Debug)]
pub struct SecurityEvents {
    failures: DashMap<String, u32>,
    warn_threshold: u32,
}

impl SecurityEvents {
    #[must_use]
    pub fn new(warn_threshold: u32) -> Self {
        Self {
            failures: DashMap::new(),
            warn_threshold: warn_threshold.max(1),
        }
    }

    /// First 8 bytes of the SHA-256 of `raw`, hex-encoded.
    #[must_use]
    pub fn fingerprint(raw: &str) -> String {
        hex::encode(&Sha256::digest(raw.as_bytes())[..8])
    }

    /// Logs a failed authentication and returns how many times this
    /// credential has failed so far (0 when no credential was presented).
    pub fn record_failure(&self, domain: Domain, error: &AuthError, raw: Option<&str>) -> u32 {
        let Some(raw) = raw else {
            info!(
                target: SECURITY_TARGET,
                domain = domain.as_str(),
                kind = error.kind(),
                "request without credential rejected"
            );
            return 0;
        };

        if self.failures.len() >= MAX_TRACKED {
            self.failures.clear();
        }
        let fingerprint = Self::fingerprint(raw);
        let count = {
            let mut entry = self.failures.entry(fingerprint.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        if count >= self.warn_threshold || matches!(error, AuthError::CrossDomainAttempt { .. }) {
            warn!(
                target: SECURITY_TARGET,
                domain = domain.as_str(),
                reason = %error,
                fingerprint = %fingerprint,
                attempts = count,
                "repeated or cross-domain authentication failure"
            );
        } else {
            info!(
                target: SECURITY_TARGET,
                domain = domain.as_str(),
                reason = %error,
                fingerprint = %fingerprint,
                attempts = count,
                "authentication failed"
            );
        }
        count
    }

    /// Forgets past failures of a credential that just authenticated.
    pub fn record_success(&self, raw: &str) {
        if !self.failures.is_empty() {
            self.failures.remove(&Self::fingerprint(raw));
        }
    }
}

impl Default for SecurityEvents {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CodecError;

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = SecurityEvents::fingerprint("token");
        assert_eq!(a, SecurityEvents::fingerprint("token"));
        assert_eq!(a.len(), 16);
        assert_ne!(a, SecurityEvents::fingerprint("other"));
    }

    #[test]
    fn failures_accumulate_per_credential_and_reset_on_success() {
        let events = SecurityEvents::new(3);
        let err = AuthError::from(CodecError::InvalidSignature);
        assert_eq!(events.record_failure(Domain::Tenant, &err, Some("t1")), 1);
        assert_eq!(events.record_failure(Domain::Tenant, &err, Some("t1")), 2);
        assert_eq!(events.record_failure(Domain::Tenant, &err, Some("t2")), 1);

        events.record_success("t1");
        assert_eq!(events.record_failure(Domain::Tenant, &err, Some("t1")), 1);
    }

    #[test]
    fn missing_credential_is_not_tracked() {
        let events = SecurityEvents::default();
        let err = AuthError::from(CodecError::Malformed);
        assert_eq!(events.record_failure(Domain::Admin, &err, None), 0);
        assert!(events.failures.is_empty());
    }
}
