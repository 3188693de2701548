use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use habit_core::config::CONFIG_TEMPLATE;
use habit_core::HeroConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a commented config template
    Init(InitArgs),
    /// Print the effective config with secrets redacted
    Show,
    /// Show config file path
    Path,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    let path = config_path.map_or_else(HeroConfig::config_path, Path::to_path_buf);
    match args.command {
        ConfigCommands::Init(args) => run_init(args, &path),
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_init(args: InitArgs, path: &Path) -> Result<()> {
    if path.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            path
        ));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)
        .context(format!("Failed to write config file: {:?}", path))?;

    println!("✅ Created config at: {:?}", path);
    println!("\nNext steps:");
    println!("  1. Edit the config: $EDITOR {:?}", path);
    println!("  2. Set auth.jwks_url and auth.issuer (or switch to static tokens)");
    println!("  3. Run: habit-hero migrate && habit-hero serve");
    Ok(())
}

fn run_show(path: &Path) -> Result<()> {
    let config = super::load_config(Some(path))?;
    let rendered =
        toml::to_string_pretty(&config.redacted()).context("Failed to render config")?;
    println!("# {}", path.display());
    print!("{}", rendered);

    if let Err(e) = config.validate() {
        eprintln!("⚠ {}", e);
    }
    Ok(())
}
