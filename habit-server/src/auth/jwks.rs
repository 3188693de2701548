use std::time::{Duration, Instant};

use async_trait::async_trait;
use habit_core::config::AuthSection;
use habit_core::models::UserId;
use habit_core::ConfigError;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{AuthError, SessionVerifier};

/// Fetch timeout for the key set
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct JwksSettings {
    pub jwks_url: String,
    pub issuer: String,
    /// Accepted `azp` values; empty accepts any
    pub authorized_parties: Vec<String>,
    pub cache_ttl: Duration,
}

impl JwksSettings {
    pub fn from_config(auth: &AuthSection) -> Result<Self, ConfigError> {
        let jwks_url = auth
            .jwks_url
            .clone()
            .ok_or_else(|| ConfigError::invalid("auth.jwks_url is required in jwks mode"))?;
        let issuer = auth
            .issuer
            .clone()
            .ok_or_else(|| ConfigError::invalid("auth.issuer is required in jwks mode"))?;
        Ok(Self {
            jwks_url,
            issuer,
            authorized_parties: auth.authorized_parties.clone(),
            cache_ttl: Duration::from_secs(auth.jwks_cache_secs),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    azp: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched: Instant,
}

/// RS256 session tokens checked against a remote JWKS
pub struct JwksVerifier {
    settings: JwksSettings,
    client: Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl JwksVerifier {
    pub fn new(settings: JwksSettings) -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            settings,
            client,
            cache: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.settings.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeySet(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySet(format!(
                "{} returned {}",
                self.settings.jwks_url,
                response.status()
            )));
        }

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::KeySet(e.to_string()))?;
        tracing::debug!(keys = keys.keys.len(), "jwks fetched");
        Ok(keys)
    }

    /// Key for `kid`; refetches when the cache is stale or lacks the kid.
    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched.elapsed() < self.settings.cache_ttl {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return DecodingKey::from_jwk(jwk)
                            .map_err(|e| AuthError::KeySet(e.to_string()));
                    }
                }
            }
        }

        let keys = self.fetch().await?;
        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| AuthError::KeySet(e.to_string()))?;
        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched: Instant::now(),
        });
        key.ok_or_else(|| AuthError::InvalidToken(format!("unknown key id '{}'", kid)))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.settings.issuer]);
        validation.validate_aud = false;
        validation.leeway = 5;
        validation
    }
}

#[async_trait]
impl SessionVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token has no key id".to_owned()))?;

        let key = self.key_for(&kid).await?;
        let data = decode::<SessionClaims>(token, &key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let claims = data.claims;

        if !self.settings.authorized_parties.is_empty() {
            let azp_ok = claims
                .azp
                .as_deref()
                .is_some_and(|azp| self.settings.authorized_parties.iter().any(|p| p == azp));
            if !azp_ok {
                return Err(AuthError::InvalidToken("unauthorized party".to_owned()));
            }
        }

        UserId::new(&claims.sub).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}
