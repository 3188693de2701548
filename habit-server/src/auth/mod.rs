//! Request authentication
//!
//! A [`SessionVerifier`] turns a bearer token into the caller's
//! [`UserId`]. Production uses session JWTs checked against the
//! provider's JWKS; development and tests use a static token table.

mod jwks;
mod static_tokens;

use std::sync::Arc;

use async_trait::async_trait;
use habit_core::config::AuthSection;
use habit_core::{AuthMode, ConfigError};
use habit_core::models::UserId;

pub use jwks::{JwksSettings, JwksVerifier};
pub use static_tokens::StaticTokens;

/// Cookie the session provider sets for same-site front ends
pub const SESSION_COOKIE: &str = "__session";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The key set could not be fetched or parsed
    #[error("key set unavailable: {0}")]
    KeySet(String),
}

#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Build the verifier selected by `auth.mode`.
pub fn build_verifier(auth: &AuthSection) -> Result<Arc<dyn SessionVerifier>, ConfigError> {
    match auth.mode {
        AuthMode::Static => {
            let tokens = StaticTokens::from_config(&auth.tokens)?;
            tracing::warn!(tokens = tokens.len(), "auth: static token mode");
            Ok(Arc::new(tokens))
        }
        AuthMode::Jwks => {
            let settings = JwksSettings::from_config(auth)?;
            tracing::info!(jwks_url = %settings.jwks_url, issuer = %settings.issuer, "auth: jwks mode");
            Ok(Arc::new(JwksVerifier::new(settings)))
        }
    }
}

/// Token from `Authorization: Bearer ...`, else from the session cookie.
pub fn token_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    use axum::http::header::{AUTHORIZATION, COOKIE};

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_owned());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_owned())
}
