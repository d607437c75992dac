//! Identity tokens and credential hashing.
//!
//! Tokens are HS256 JWTs signed with a shared secret; claims carry the
//! user id, email, and role. Credentials are hashed with argon2id. The
//! hash never leaves the storage layer.

mod extract;

pub use extract::Operator;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::domain::user::{Role, User};
use crate::error::{errmsg, Error, Result};

/// The authenticated caller, reconstructed from a verified token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_operator(&self) -> bool {
        self.role.is_operator()
    }
}

/// Token claims on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    sub: String,
    email: String,
    role: Role,
    /// Expiry, seconds since the epoch.
    exp: i64,
}

/// Issues and verifies identity tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::days(config.token_ttl_days),
        }
    }

    /// Issue a signed token for the user.
    pub fn issue(&self, user: &User) -> Result<String> {
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("token signing failed: {e}")))
    }

    /// Verify a token and reconstruct the caller's identity.
    ///
    /// Signature and expiry failures are indistinguishable to the caller.
    pub fn verify(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| Error::Authentication(errmsg::INVALID_TOKEN.to_string()))?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| Error::Authentication(errmsg::INVALID_TOKEN.to_string()))?;

        Ok(Identity {
            id,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

/// Hash a password with argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored hash. An unparseable hash verifies
/// as false rather than erroring, so accounts without a local credential
/// simply cannot log in with a password.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        let config = AuthConfig {
            secret: "test-secret".to_string(),
            token_ttl_days: 7,
            bootstrap_operator: None,
        };
        TokenIssuer::new(&config)
    }

    fn user(role: Role) -> User {
        User::new(
            "Ada".into(),
            "ada@example.com".into(),
            "hash".into(),
            role,
        )
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let issuer = issuer();
        let user = user(Role::Operator);
        let token = issuer.issue(&user).unwrap();
        let identity = issuer.verify(&token).unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.email, user.email);
        assert!(identity.is_operator());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let err = issuer().verify("not-a-token").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_verify_rejects_other_secret() {
        let token = issuer().issue(&user(Role::Customer)).unwrap();
        let other = TokenIssuer::new(&AuthConfig {
            secret: "different".to_string(),
            token_ttl_days: 7,
            bootstrap_operator: None,
        });
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_empty_stored_hash_never_verifies() {
        assert!(!verify_password("anything", ""));
    }
}
