//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Diagnoses the engine installation.
pub mod check;
/// Shows and initializes the user config file.
pub mod config;
/// Runs the engine on a video and reports the generated clips.
pub mod process;
