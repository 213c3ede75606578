//! Bearer token authentication
//!
//! Tokens are HS256 JWTs carrying the username and an expiry. Every
//! `/api/v1` route requires `Authorization: Bearer <token>`.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use anyhow::{Context, Result};
use axum::response::Response;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::ApiError;
use crate::server::AppState;

/// Token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user
    pub username: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

/// Signs and checks bearer tokens with one shared secret
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer signing with `secret`, tokens valid for `ttl`
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    /// Issue a token for `username`
    ///
    /// Fails if the expiry does not fit a Unix timestamp.
    pub fn issue(&self, username: &str) -> Result<String> {
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| Utc::now().timestamp().checked_add(ttl))
            .context("Token lifetime out of range")?;

        let claims = Claims {
            username: username.to_string(),
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign token")
    }

    /// Check signature, algorithm and expiry of `token`
    pub fn verify(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}

/// Reject requests without a valid bearer token
///
/// The verified [`Claims`] are attached to the request extensions.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing token".to_string()))?;

    let token = header.strip_prefix("Bearer ").unwrap_or(header);
    let claims = state
        .tokens
        .verify(token)
        .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

    debug!("Authenticated request for {}", claims.username);
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
