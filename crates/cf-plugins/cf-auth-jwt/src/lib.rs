//! # cf-auth-jwt
//!
//! Argon2 + HS256 JWT implementation of `AuthProvider`.
//! Handles password hashing, bearer tokens and the confirmation codes mailed
//! at registration.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use cf_core::error::{AppError, Result};
use cf_core::models::UserId;
use cf_core::traits::AuthProvider;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct JwtAuthProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl JwtAuthProvider {
    /// Accepts the signing secret (e.g., from `CONNECTIFY__AUTH__JWT_SECRET`)
    pub fn new(secret: &SecretString, token_ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            token_ttl,
        }
    }
}

fn random_bytes<const N: usize>() -> anyhow::Result<[u8; N]> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).map_err(|err| anyhow::anyhow!("os rng unavailable: {err}"))?;
    Ok(buf)
}

fn hash_blocking(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::encode_b64(&random_bytes::<16>()?)
        .map_err(|err| anyhow::anyhow!("salt encoding failed: {err}"))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("password hashing failed: {err}"))?;
    Ok(hash.to_string())
}

fn verify_blocking(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    /// Hashing runs on the blocking pool.
    async fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_blocking(&password)).await?
    }

    /// Verification runs on the blocking pool as well.
    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let (password, hash) = (password.to_string(), hash.to_string());
        match tokio::task::spawn_blocking(move || verify_blocking(&password, &hash)).await {
            Ok(valid) => valid,
            Err(err) => {
                tracing::error!(error = %err, "password verification task failed");
                false
            }
        }
    }

    fn issue_token(&self, user_id: UserId) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    fn verify_token(&self, token: &str) -> Result<UserId> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256)).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            AppError::Unauthorized("invalid or expired token".into())
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized("malformed token subject".into()))
    }

    fn generate_confirmation_code(&self) -> anyhow::Result<String> {
        let value = u32::from_le_bytes(random_bytes::<4>()?) % 1_000_000;
        Ok(format!("{value:06}"))
    }
}
