//! Bearer credential codec.
//!
//! One [`TokenCodec`] per domain. Each codec owns its secret, its audience,
//! its header `typ`, and its claim schema, so a credential minted for one
//! domain cannot decode under the other even if secrets were ever shared.

use std::marker::PhantomData;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use vigil_core::{Domain, DomainClaims};

/// Why a credential did not decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("credential signature is invalid")]
    InvalidSignature,
    #[error("credential has expired")]
    Expired,
    #[error("credential is malformed")]
    Malformed,
    /// The header names the other domain. Classified separately for logging
    /// only; callers must not respond differently than for `Malformed`.
    #[error("credential belongs to the {presented} domain")]
    ForeignDomain { presented: Domain },
    #[error("failed to encode credential: {0}")]
    Encode(String),
}

/// Verifies and decodes credentials of one domain.
pub struct TokenCodec<C: DomainClaims> {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    leeway_secs: u64,
    _claims: PhantomData<fn() -> C>,
}

impl<C: DomainClaims> TokenCodec<C> {
    /// Builds a codec for `C`'s domain with the given HMAC secret and
    /// clock-skew tolerance.
    #[must_use]
    pub fn new(secret: &[u8], leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.validate_exp = true;
        validation.set_audience(&[C::DOMAIN.audience()]);
        validation.set_required_spec_claims(&["exp", "aud"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            leeway_secs,
            _claims: PhantomData,
        }
    }

    /// The domain this codec serves.
    #[must_use]
    pub fn domain(&self) -> Domain {
        C::DOMAIN
    }

    /// Signs `claims` as a credential of this domain.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization or signing fails.
    pub fn encode(&self, claims: &C) -> Result<String, CodecError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some(C::DOMAIN.token_type().to_string());
        jsonwebtoken::encode(&header, claims, &self.encoding)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Verifies `raw` and returns its claims.
    ///
    /// Checks, in order: header shape and `typ`, signature, expiry (with
    /// leeway), audience, claim schema, and that `iat` is not in the future.
    ///
    /// # Errors
    ///
    /// See [`CodecError`].
    pub fn decode(&self, raw: &str) -> Result<C, CodecError> {
        match peek_domain(raw) {
            Some(domain) if domain == C::DOMAIN => {}
            Some(presented) => return Err(CodecError::ForeignDomain { presented }),
            None => return Err(CodecError::Malformed),
        }

        let data = jsonwebtoken::decode::<C>(raw, &self.decoding, &self.validation)
            .map_err(|e| classify(e.kind()))?;

        let now = i64::try_from(jsonwebtoken::get_current_timestamp()).unwrap_or(i64::MAX);
        let leeway = i64::try_from(self.leeway_secs).unwrap_or(i64::MAX);
        if data.claims.issued_at() > now.saturating_add(leeway) {
            return Err(CodecError::Malformed);
        }
        Ok(data.claims)
    }
}

/// Domain named by the unverified header of `raw`.
///
/// Only used to classify failures; a match grants nothing until the full
/// decode succeeds.
#[must_use]
pub fn peek_domain(raw: &str) -> Option<Domain> {
    let header = jsonwebtoken::decode_header(raw).ok()?;
    header.typ.as_deref().and_then(Domain::from_token_type)
}

fn classify(kind: &ErrorKind) -> CodecError {
    match kind {
        ErrorKind::InvalidSignature => CodecError::InvalidSignature,
        ErrorKind::ExpiredSignature => CodecError::Expired,
        _ => CodecError::Malformed,
    }
}
