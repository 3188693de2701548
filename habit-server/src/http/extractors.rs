//! Custom Axum extractors
//!
//! Wrappers around the stock extractors that reject with [`ApiError`]
//! so every failure carries the JSON error envelope.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use chrono_tz::Tz;
use habit_core::models::{UserId, ValidationError};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::server::AppState;
use crate::auth::{token_from_headers, AuthError};

/// Header carrying the caller's IANA time zone
pub const TIMEZONE_HEADER: &str = "x-timezone";

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(AuthError::MissingToken)?;
        let user = state.verifier.verify(&token).await?;
        Ok(Self(user))
    }
}

/// Caller's time zone: `X-Timezone`, else the configured default
#[derive(Debug, Clone, Copy)]
pub struct ClientTz(pub Tz);

impl FromRequestParts<Arc<AppState>> for ClientTz {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(TIMEZONE_HEADER) else {
            return Ok(Self(state.default_tz));
        };
        let name = value.to_str().unwrap_or_default().trim();
        name.parse::<Tz>().map(Self).map_err(|_| {
            ApiError::from(ValidationError::Invalid {
                field: "X-Timezone",
                reason: format!("unknown time zone '{}'", name),
            })
        })
    }
}

/// JSON body; malformed input is a 400 in the error envelope
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Path parameters (ids are UUIDs; anything else is a 400)
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}
