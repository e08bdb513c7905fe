use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("malformed or unsigned token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Decodes a bearer token into validated session claims.
pub trait JwtValidator: Send + Sync + 'static {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, JwtError>;
}

/// HMAC-SHA256 token validator with a shared secret.
///
/// Time checks run against the RFC 3339 `issued_at`/`expires_at` claims
/// rather than the registered `exp`/`iat` numbers.
#[derive(Clone)]
pub struct Hs256JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign claims with the same secret. Used by tests and local tooling.
    pub fn issue(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, JwtError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kitroom_core::UserId;

    use crate::Role;

    fn claims(role: Role) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            sub: UserId::new(),
            name: "Coach Rivera".to_string(),
            email: "rivera@example.edu".to_string(),
            role,
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::hours(1),
        }
    }

    #[test]
    fn issued_tokens_validate() {
        let jwt = Hs256JwtValidator::new("secret");
        let c = claims(Role::Admin);
        let token = jwt.issue(&c).unwrap();
        assert_eq!(jwt.validate(&token, Utc::now()).unwrap(), c);
    }

    #[test]
    fn wrong_secret_is_a_decode_error() {
        let token = Hs256JwtValidator::new("one").issue(&claims(Role::User)).unwrap();
        let err = Hs256JwtValidator::new("two")
            .validate(&token, Utc::now())
            .unwrap_err();
        assert!(matches!(err, JwtError::Decode(_)));
    }

    #[test]
    fn expired_claims_are_rejected_after_signature_check() {
        let jwt = Hs256JwtValidator::new("secret");
        let c = claims(Role::User);
        let token = jwt.issue(&c).unwrap();
        let err = jwt.validate(&token, c.expires_at).unwrap_err();
        assert!(matches!(err, JwtError::Claims(TokenValidationError::Expired)));
    }

    #[test]
    fn garbage_is_rejected() {
        let jwt = Hs256JwtValidator::new("secret");
        assert!(jwt.validate("not.a.token", Utc::now()).is_err());
    }
}
