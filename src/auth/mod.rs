use argon2::password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, role: Role, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authorized to access this route")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token generation failed: {0}")]
    Signing(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

pub fn generate_jwt(security: &SecurityConfig, user_id: Uuid, role: Role) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::Signing("JWT secret is not configured".to_string()));
    }

    let claims = Claims::new(user_id, role, security.jwt_expiry_hours);
    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    encode(&Header::default(), &claims, &encoding_key).map_err(|e| AuthError::Signing(e.to_string()))
}

pub fn validate_jwt(security: &SecurityConfig, token: &str) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidToken);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("JWT rejected: {}", e);
            AuthError::InvalidToken
        })
}

/// Argon2id hash in PHC string form (`$argon2id$v=19$...`), salt included
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// `Ok(false)` on a wrong password; an error only when `stored` is not a PHC hash
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hashing(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            cors_origins: vec![],
        }
    }

    #[test]
    fn token_round_trip_keeps_subject_and_role() {
        let id = Uuid::new_v4();
        let token = generate_jwt(&security(), id, Role::Publisher).unwrap();
        let claims = validate_jwt(&security(), &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Publisher);
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let token = generate_jwt(&security(), Uuid::new_v4(), Role::User).unwrap();
        let other = SecurityConfig { jwt_secret: "other".to_string(), ..security() };
        assert!(matches!(validate_jwt(&other, &token), Err(AuthError::InvalidToken)));
        assert!(matches!(validate_jwt(&security(), "garbage"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let empty = SecurityConfig { jwt_secret: String::new(), ..security() };
        assert!(matches!(generate_jwt(&empty, Uuid::new_v4(), Role::User), Err(AuthError::Signing(_))));
    }

    #[test]
    fn passwords_are_salted_argon2_hashes() {
        let first = hash_password("123456").unwrap();
        let second = hash_password("123456").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(verify_password("123456", &first).unwrap());
        assert!(!verify_password("1234567", &first).unwrap());
    }

    #[test]
    fn stored_values_that_are_not_hashes_are_errors() {
        assert!(matches!(verify_password("123456", "123456"), Err(AuthError::Hashing(_))));
        let legacy = "0f1e2d3c$8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92";
        assert!(verify_password("123456", legacy).is_err());
    }
}
