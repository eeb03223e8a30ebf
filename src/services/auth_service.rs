//! Authentication service
//!
//! Single administrator credential: the configured argon2 hash is checked
//! at login and a short-lived HS256 token is issued. Whitelist passwords
//! use the same hashing helpers.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    constants::ADMIN_TOKEN_EXPIRY_HOURS,
    error::{AppError, AppResult},
};

/// JWT claims for an admin session token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication service
pub struct AuthService;

impl AuthService {
    /// Verify the admin password and issue a session token with its expiry
    /// in seconds
    pub fn login(config: &Config, password: &str) -> AppResult<(String, i64)> {
        if !Self::verify_password(password, &config.security.admin_password_hash)? {
            return Err(AppError::AuthFailed);
        }
        Self::generate_token(&config.security.secret_key)
    }

    /// Issue a token signed with the configured secret
    pub fn generate_token(secret: &str) -> AppResult<(String, i64)> {
        let now = Utc::now();
        let expires_in = Duration::hours(ADMIN_TOKEN_EXPIRY_HOURS).num_seconds();
        let claims = Claims {
            sub: "admin".to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + expires_in,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;

        Ok((token, expires_in))
    }

    /// Validate a session token
    pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// Hash a password with argon2
    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Verify a password against an argon2 hash
    pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = AuthService::hash_password("s3cret").unwrap();
        assert!(AuthService::verify_password("s3cret", &hash).unwrap());
        assert!(!AuthService::verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn token_round_trip() {
        let (token, expires_in) = AuthService::generate_token("test-secret").unwrap();
        assert!(expires_in > 0);

        let claims = AuthService::verify_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "admin");

        assert!(AuthService::verify_token(&token, "other-secret").is_err());
    }
}
