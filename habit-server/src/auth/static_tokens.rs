use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use habit_core::models::UserId;
use habit_core::ConfigError;

use super::{AuthError, SessionVerifier};

/// Fixed token -> user table
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, UserId>,
}

impl StaticTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: impl Into<String>, user: UserId) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }

    pub fn from_config(tokens: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        if tokens.is_empty() {
            return Err(ConfigError::invalid("auth.tokens is empty in static mode"));
        }
        tokens.iter().try_fold(Self::new(), |acc, (token, user)| {
            let user = UserId::new(user)
                .map_err(|e| ConfigError::invalid(format!("auth.tokens: {}", e)))?;
            Ok(acc.with(token.clone(), user))
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl SessionVerifier for StaticTokens {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_owned()))
    }
}
