use axum::http::StatusCode;
use vigil_core::Domain;

use super::codec::CodecError;
use super::resolver::ResolveError;

/// Authentication failure of either pipeline.
///
/// Every variant aborts the request. Clients only ever see [`AuthError::kind`]
/// and [`AuthError::status`]; the `Display` text is for server logs.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credential: {0}")]
    TokenInvalid(CodecError),
    #[error("credential expired")]
    TokenExpired,
    #[error("principal not resolvable: {0}")]
    PrincipalNotResolvable(#[from] ResolveError),
    /// Reported to the client exactly like [`AuthError::TokenInvalid`].
    #[error("{presented} credential presented to the {expected} pipeline")]
    CrossDomainAttempt { presented: Domain, expected: Domain },
}

impl AuthError {
    /// Client-facing failure kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TokenInvalid(_) | Self::CrossDomainAttempt { .. } => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::PrincipalNotResolvable(_) => "unauthenticated",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl From<CodecError> for AuthError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Expired => Self::TokenExpired,
            CodecError::ForeignDomain { presented } => Self::CrossDomainAttempt {
                presented,
                expected: match presented {
                    Domain::Admin => Domain::Tenant,
                    Domain::Tenant => Domain::Admin,
                },
            },
            other => Self::TokenInvalid(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_domain_is_indistinguishable_from_invalid_token() {
        let cross = AuthError::from(CodecError::ForeignDomain {
            presented: Domain::Tenant,
        });
        let invalid = AuthError::from(CodecError::InvalidSignature);
        assert!(matches!(
            cross,
            AuthError::CrossDomainAttempt {
                presented: Domain::Tenant,
                expected: Domain::Admin
            }
        ));
        assert_eq!(cross.kind(), invalid.kind());
        assert_eq!(cross.status(), invalid.status());
    }

    #[test]
    fn expiry_has_its_own_kind() {
        let err = AuthError::from(CodecError::Expired);
        assert_eq!(err.kind(), "token_expired");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn resolution_failures_are_unauthenticated() {
        let err = AuthError::from(ResolveError::NoCredential);
        assert_eq!(err.kind(), "unauthenticated");
    }
}
