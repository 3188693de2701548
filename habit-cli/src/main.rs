//! habit-hero CLI - Habit Hero API server and maintenance commands
//!
//! - `serve`: run the HTTP API (PostgreSQL or in-memory storage)
//! - `migrate`: create the database schema
//! - `config`: write a template or print the effective configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "habit-hero",
    author,
    version,
    about = "Habit Hero backend: habits, completion logs, streaks, goals and analytics",
    long_about = "Serve the Habit Hero JSON API over PostgreSQL or an in-memory store, \
                  run schema migrations, and manage the service configuration."
)]
struct Cli {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (needs the `telemetry` feature)
    #[arg(long, global = true)]
    otel: bool,

    /// Config file (default: ~/.habit-hero/config.toml)
    #[arg(long, global = true, env = "HABIT_HERO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Create tables and indexes (idempotent)
    Migrate(commands::migrate::MigrateArgs),
    /// Manage habit-hero configuration (init, show, path)
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args, config_path).await,
        Commands::Migrate(args) => commands::run_migrate(args, config_path).await,
        Commands::Config(args) => commands::run_config(args, config_path),
    };

    tracing_setup::shutdown_otel();
    result
}
