//! HTTP server command
//!
//! Builds storage and auth from the effective config and runs the API
//! until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use habit_core::HeroConfig;
use habit_server::auth::build_verifier;
use habit_server::db::{create_pool_with_options, migrations};
use habit_server::http::{run_server, AppState, ServerConfig};
use habit_server::Repositories;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config and HABIT_HERO_BIND)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config and DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Keep everything in memory; data is lost on exit
    #[arg(long, conflicts_with = "database_url")]
    pub in_memory: bool,
}

impl ServeArgs {
    fn apply(&self, config: &mut HeroConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if self.cors_permissive {
            config.server.cors_permissive = true;
        }
        if let Some(url) = &self.database_url {
            config.database.url = Some(url.clone());
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let default_tz = config.timezone()?;
    let verifier = build_verifier(&config.auth).context("Failed to set up authentication")?;

    let (repos, storage) = if args.in_memory {
        tracing::warn!("Using in-memory storage; data will not survive a restart");
        (Repositories::memory(), "memory")
    } else {
        let url = config.database.url.as_deref().context(
            "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, the config file, or use --in-memory",
        )?;
        let pool = create_pool_with_options(url, config.database.max_connections)
            .await
            .context("Failed to create database pool")?;
        migrations::run(&pool)
            .await
            .context("Failed to apply migrations")?;
        (Repositories::postgres(pool), "postgres")
    };

    tracing::info!(
        bind = %config.server.bind,
        storage,
        auth = ?config.auth.mode,
        timezone = %default_tz,
        "Starting habit-hero server"
    );

    let state = AppState {
        repos,
        verifier,
        default_tz,
        storage,
    };
    run_server(Arc::new(state), ServerConfig::from(&config.server))
        .await
        .context("Server error")?;

    Ok(())
}
