//! Configuration for the Habit Hero service
//!
//! Sources, lowest precedence first: built-in defaults,
//! `~/.habit-hero/config.toml` (or `HABIT_HERO_CONFIG`), environment
//! variables, then command-line flags applied by the binary.

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Password part of a database URL
static URL_PASSWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(://[^:/@]+:)[^@]+@").expect("invalid url password regex"));

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

impl ConfigError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub app: AppSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    /// Allow any origin; development only
    pub cors_permissive: bool,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
            allowed_origins: vec![
                "http://localhost:3000".to_owned(),
                "http://127.0.0.1:3000".to_owned(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

/// How bearer tokens are checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// RS256 session JWTs checked against the provider's JWKS
    #[default]
    Jwks,
    /// Fixed token table for development and tests
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub mode: AuthMode,
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub authorized_parties: Vec<String>,
    /// Seconds a fetched key set stays fresh
    pub jwks_cache_secs: u64,
    /// token -> user id, static mode only
    pub tokens: BTreeMap<String, String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            jwks_url: None,
            issuer: None,
            authorized_parties: Vec::new(),
            jwks_cache_secs: 3600,
            tokens: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// IANA zone used when a request carries no `X-Timezone`
    pub default_timezone: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_owned(),
        }
    }
}

/// Template written by `habit-hero config init`
pub const CONFIG_TEMPLATE: &str = r#"# Habit Hero configuration

[server]
bind = "127.0.0.1:3030"
cors_permissive = false
allowed_origins = ["http://localhost:3000"]

[database]
# url = "postgres://localhost/habit_hero"
max_connections = 5

[auth]
mode = "jwks"
# jwks_url = "https://your-app.clerk.accounts.dev/.well-known/jwks.json"
# issuer = "https://your-app.clerk.accounts.dev"
authorized_parties = ["http://localhost:3000"]

# Static tokens, used when mode = "static"
[auth.tokens]
# "dev-token" = "user_dev"

[app]
default_timezone = "UTC"
"#;

impl HeroConfig {
    /// Config file path: `$HABIT_HERO_CONFIG` or `~/.habit-hero/config.toml`.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("HABIT_HERO_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".habit-hero/config.toml")
    }

    /// Load the file at `path` (or the default path); a missing file
    /// yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(Self::config_path, Path::to_path_buf);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `DATABASE_URL`, `HABIT_HERO_BIND` and `HABIT_HERO_TIMEZONE`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(bind) = lookup("HABIT_HERO_BIND") {
            self.server.bind = bind
                .parse()
                .map_err(|_| ConfigError::invalid(format!("HABIT_HERO_BIND '{}' is not host:port", bind)))?;
        }
        if let Some(tz) = lookup("HABIT_HERO_TIMEZONE") {
            self.app.default_timezone = tz;
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.app.default_timezone.parse::<Tz>().map_err(|_| {
            ConfigError::invalid(format!(
                "unknown time zone '{}'",
                self.app.default_timezone
            ))
        })
    }

    /// Check cross-field requirements before serving.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;

        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid("database.max_connections must be at least 1"));
        }

        match self.auth.mode {
            AuthMode::Jwks => {
                if self.auth.jwks_url.is_none() {
                    return Err(ConfigError::invalid("auth.jwks_url is required in jwks mode"));
                }
                if self.auth.issuer.is_none() {
                    return Err(ConfigError::invalid("auth.issuer is required in jwks mode"));
                }
            }
            AuthMode::Static => {
                if self.auth.tokens.is_empty() {
                    return Err(ConfigError::invalid("auth.tokens is empty in static mode"));
                }
            }
        }
        Ok(())
    }

    /// Copy safe to print: tokens and database password masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.auth.tokens = self
            .auth
            .tokens
            .values()
            .enumerate()
            .map(|(i, user)| (format!("<token {}>", i + 1), user.clone()))
            .collect();
        copy.database.url = self
            .database
            .url
            .as_deref()
            .map(|url| URL_PASSWORD_RE.replace(url, "${1}***@").into_owned());
        copy
    }
}
