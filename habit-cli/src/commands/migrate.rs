//! Schema migration command

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use habit_server::db::{create_pool, migrations};

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config and DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let url = args
        .database_url
        .or(config.database.url)
        .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or the config file")?;

    let pool = create_pool(&url)
        .await
        .context("Failed to connect to database")?;
    migrations::run(&pool)
        .await
        .context("Migration failed")?;

    println!("✅ Schema is up to date");
    Ok(())
}
