//! Command implementations for habit-hero

pub mod config;
pub mod migrate;
pub mod serve;

use std::path::Path;

use anyhow::{Context, Result};
use habit_core::HeroConfig;

pub use config::run_config;
pub use migrate::run_migrate;
pub use serve::run_serve;

/// Config file, then environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<HeroConfig> {
    let mut config = HeroConfig::load(path).context("Failed to load config")?;
    config
        .apply_env()
        .context("Invalid environment override")?;
    Ok(config)
}
