// arena-cli/src/lib.rs
//
// Library portion of the Arena CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod preflight;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, ConfigCommand, ProcessArgs};
pub use commands::check::run_check;
pub use commands::config::run_config;
pub use commands::process::run_process;
pub use config::UserConfig;
pub use error::{CliResult, report_error};
