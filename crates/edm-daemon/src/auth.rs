//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs carrying the user id, email, role and a unique
//! `jti`. Logout puts the `jti` on the cache-backed denylist until the
//! token would have expired anyway.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use edm_schemas::{Role, User};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Lifetime left at `now`, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        let secs = self.exp.saturating_sub(now.timestamp());
        std::time::Duration::from_secs(u64::try_from(secs).unwrap_or(0))
    }
}

/// Signing and verification keys for one secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn claims_for(&self, user: &User, now: DateTime<Utc>) -> Claims {
        Claims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        }
    }

    pub fn sign(&self, claims: &Claims) -> ApiResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(ApiError::internal)
    }

    /// Fresh token for `user`.
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> ApiResult<String> {
        self.sign(&self.claims_for(user, now))
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::InvalidToken,
            })
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// The authenticated caller. Rejects with 401 when the bearer token is
/// missing, malformed, expired or revoked.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.claims.user_id
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        st: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let claims = st.tokens.verify(token)?;
        if st.denylist.is_revoked(&claims.jti).await {
            return Err(ApiError::InvalidToken);
        }
        Ok(AuthUser { claims })
    }
}

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// bcrypt on the blocking pool.
pub async fn hash_password(plain: &str, cost: u32) -> ApiResult<String> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(plain: &str, hash: &str) -> ApiResult<bool> {
    let plain = plain.to_string();
    let hash = hash.to_string();
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash).unwrap_or(false))
        .await
        .map_err(ApiError::internal)?;
    Ok(ok)
}
