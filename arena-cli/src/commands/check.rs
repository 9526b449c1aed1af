//! Implementation of the 'check' subcommand.
//!
//! Runs the same engine and API key checks as `process` pre-flight, prints
//! the state of each, and fails with the first problem found.

use arena_core::bridge::ProcessBridge;
use arena_core::error::ArenaError;
use log::info;

use crate::config;
use crate::error::CliResult;
use crate::preflight::{self, API_KEY_VAR};
use crate::terminal;

/// Runs the `check` command.
pub fn run_check(bridge: &ProcessBridge) -> CliResult<()> {
    let engine = bridge.config();
    terminal::print_section("Environment");
    terminal::print_status("Config", &config::config_path().display().to_string());
    terminal::print_status("Engine", &engine.resolved_engine_dir().display().to_string());
    terminal::print_status("Entrypoint", &engine.entrypoint_path().display().to_string());
    terminal::print_status("Formatter", &format!("-m {}", engine.format_module));
    terminal::print_status("Python", &engine.python);
    println!();

    let mut failures: Vec<ArenaError> = Vec::new();

    let env = bridge.check_environment();
    match preflight::runtime_failure(&env, &engine.python) {
        None => {
            let version = env.version.as_deref().unwrap_or("unknown version");
            terminal::print_success(&format!("Python {version}"));
        }
        Some(e) => {
            terminal::print_failure(e.message());
            failures.push(e);
        }
    }

    if !engine.entrypoint_path().is_file() {
        terminal::print_warning("Engine entry script not found");
    }

    // The import probe needs a working runtime.
    if env.available {
        let deps = bridge.check_dependencies();
        match preflight::dependency_failure(&deps, &engine.engine_dir) {
            None => terminal::print_success("Engine dependencies importable"),
            Some(e) => {
                terminal::print_failure(e.message());
                failures.push(e);
            }
        }
    }

    let api_key = std::env::var(API_KEY_VAR).ok();
    match preflight::check_api_key(api_key.as_deref()) {
        Ok(()) => terminal::print_success(&format!("{API_KEY_VAR} is set")),
        Err(e) => {
            terminal::print_failure(e.message());
            failures.push(e);
        }
    }

    if failures.is_empty() {
        info!("Environment check passed");
        println!();
        terminal::print_success("Ready to process videos");
        Ok(())
    } else {
        Err(failures.remove(0).into())
    }
}
