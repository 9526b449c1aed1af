//! Implementation of the 'config' subcommands.

use std::path::Path;

use anyhow::Context;
use arena_core::config::EngineConfig;
use arena_core::error::{ArenaError, PreflightCode};
use log::info;

use crate::cli::ConfigCommand;
use crate::config::{self, UserConfig};
use crate::error::CliResult;
use crate::terminal;

/// Runs a `config` subcommand.
///
/// `loaded` is the result of reading the config file at startup; `init` and
/// `path` work even when that file is malformed.
pub fn run_config(
    command: &ConfigCommand,
    loaded: Result<UserConfig, ArenaError>,
    engine: &EngineConfig,
) -> CliResult<()> {
    let path = config::config_path();
    match command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommand::Show => show(&loaded?, engine, &path),
        ConfigCommand::Init { force } => init(&path, *force),
    }
}

fn show(config: &UserConfig, engine: &EngineConfig, path: &Path) -> CliResult<()> {
    terminal::print_section("Configuration");
    let state = if path.exists() { "" } else { " (not created)" };
    terminal::print_status("File", &format!("{}{state}", path.display()));
    terminal::print_status("Engine", &engine.engine_dir.display().to_string());
    terminal::print_status("Python", &engine.python);
    terminal::print_status("Output", &config.output_dir(None).display().to_string());
    terminal::print_status(
        "Clip count",
        &config
            .clip_count
            .map_or_else(|| "engine default".to_string(), |n| n.to_string()),
    );
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn init(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(ArenaError::preflight(
            PreflightCode::InvalidOption,
            format!("Config file already exists at {}", path.display()),
        )
        .with_suggestion("Pass --force to overwrite it")
        .into());
    }
    UserConfig::default()
        .save_to(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default config to {}", path.display());
    terminal::print_success(&format!("Created {}", path.display()));
    Ok(())
}
