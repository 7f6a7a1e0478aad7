//! Accounts, password hashing, and bearer tokens.
//!
//! Tokens are HS256 JWTs carrying `sub` (the account email) and `exp`.
//! Accounts live in memory for the lifetime of the process.

use std::collections::HashMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chainrisk_common::error::ApiError;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::state::SharedState;

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,
    #[error("Invalid auth header")]
    MalformedHeader,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    Expired,
    #[error("invalid_credentials")]
    InvalidCredentials,
    #[error("User already exists")]
    DuplicateUser,
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::DuplicateUser                   => ApiError::BadRequest(e.to_string()),
            AuthError::Hash(_) | AuthError::Signing(_) => ApiError::Internal(e.to_string()),
            _                                          => ApiError::Unauthorized(e.to_string()),
        }
    }
}

// ── Tokens ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        let claims = Claims { sub: subject.to_string(), exp: (Utc::now() + self.ttl).timestamp() };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _                           => AuthError::InvalidToken,
            })
    }
}

// ── Accounts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    password_hash: String,
}

#[derive(Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        let key = normalise_email(email);
        let password_hash = hash_password(password)?;

        let mut users = self.users.write().await;
        if users.contains_key(&key) {
            return Err(AuthError::DuplicateUser);
        }
        users.insert(key.clone(), UserRecord { name: name.trim().to_string(), email: key, password_hash });
        Ok(())
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        let users = self.users.read().await;
        let user = users.get(&normalise_email(email)).ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user.clone())
    }

    pub async fn get(&self, email: &str) -> Option<UserRecord> {
        self.users.read().await.get(&normalise_email(email)).cloned()
    }
}

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

// ── Extractors ────────────────────────────────────────────────────────────────

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts.headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    let value = header.to_str().map_err(|_| AuthError::MalformedHeader)?;
    let mut fields = value.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// An authenticated caller. Rejects with 401 when the token is missing or invalid.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.verify(token)?;
        Ok(AuthUser { email: claims.sub })
    }
}

/// Caller of a protected API route. Authentication is enforced only
/// when `auth.protect_api` is set.
#[derive(Debug, Clone)]
pub struct ApiCaller(pub Option<String>);

impl FromRequestParts<SharedState> for ApiCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        if !state.config.auth.protect_api && !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(ApiCaller(None));
        }
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(ApiCaller(Some(user.email)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    #[test]
    fn test_token_roundtrip() {
        let signer = TokenSigner::new("secret", 60);
        let token = signer.issue("a@b.com").unwrap();
        assert_eq!(token.matches('.').count(), 2);
        assert_eq!(signer.verify(&token).unwrap().sub, "a@b.com");
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = TokenSigner::new("one", 60).issue("a@b.com").unwrap();
        assert_eq!(TokenSigner::new("two", 60).verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_expired_token() {
        let signer = TokenSigner::new("secret", 60);
        let token = signer
            .encode(&Claims { sub: "a@b.com".into(), exp: Utc::now().timestamp() - 5 })
            .unwrap();
        assert_eq!(signer.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_garbage_token() {
        let signer = TokenSigner::new("secret", 60);
        assert_eq!(signer.verify("not-a-token"), Err(AuthError::InvalidToken));
        assert_eq!(signer.verify("a.b.c.d"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let signer = TokenSigner::new("secret", 60);
        let token = signer.issue("a@b.com").unwrap();
        let forged_claims = URL_SAFE_NO_PAD.encode(r#"{"sub":"admin@b.com","exp":9999999999}"#);
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_claims;
        assert_eq!(signer.verify(&parts.join(".")), Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let users = UserStore::new();
        users.register("Ada", "Ada@Example.com", "pw").await.unwrap();

        assert_eq!(users.register("Ada", "ada@example.com", "x").await, Err(AuthError::DuplicateUser));
        assert!(users.authenticate("ada@example.com", "pw").await.is_ok());
        assert_eq!(
            users.authenticate("ada@example.com", "wrong").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            users.authenticate("nobody@example.com", "pw").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }
}
