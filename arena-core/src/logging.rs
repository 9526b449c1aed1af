//! Centralized logging configuration for Arena
//!
//! This module handles:
//! - Describing the logging setup as an explicit [`LoggingConfig`] value
//! - Installing console and size-rotated file appenders with log4rs
//! - Small helpers for logging subprocess invocations
//!
//! The logger is installed once at process start by the CLI and lives until
//! the process exits; nothing in the library reinitializes it.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use log::{LevelFilter, debug};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}";
const CONSOLE_PATTERN: &str = "{h({l:<5})} {m}{n}";

/// Size-based log rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Roll the file once it grows past this many bytes.
    pub max_size_bytes: u64,
    /// Number of rolled files to keep next to the active one.
    pub keep_files: u32,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: 5 * 1024 * 1024,
            keep_files: 3,
        }
    }
}

/// Explicit logging setup, built by the CLI at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum level recorded by every destination.
    pub level: LevelFilter,
    /// Mirror log records to stderr.
    pub console: bool,
    /// Optional log file.
    pub log_file: Option<PathBuf>,
    /// Rotation for `log_file`; `None` appends forever.
    pub rotation: Option<RotationPolicy>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            console: false,
            log_file: None,
            rotation: Some(RotationPolicy::default()),
        }
    }
}

impl LoggingConfig {
    /// Builds the log4rs configuration without installing it.
    pub fn build(&self) -> Result<Config> {
        let mut builder = Config::builder();
        let mut root = Root::builder();

        if self.console {
            let console = ConsoleAppender::builder()
                .target(Target::Stderr)
                .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
                .build();
            builder = builder.appender(Appender::builder().build("console", Box::new(console)));
            root = root.appender("console");
        }

        if let Some(path) = &self.log_file {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let appender = build_file_appender(path, self.rotation.as_ref())?;
            builder = builder.appender(Appender::builder().build("file", appender));
            root = root.appender("file");
        }

        Ok(builder.build(root.build(self.level))?)
    }

    /// Installs the global logger. Call once, at process start.
    pub fn init(&self) -> Result<()> {
        let config = self.build()?;
        log4rs::init_config(config)?;
        debug!("Logger initialized with level: {}", self.level);
        Ok(())
    }
}

fn build_file_appender(
    path: &Path,
    rotation: Option<&RotationPolicy>,
) -> Result<Box<dyn log4rs::append::Append>> {
    let encoder = Box::new(PatternEncoder::new(FILE_PATTERN));
    match rotation {
        Some(policy) => {
            let roll_pattern = format!("{}.{{}}", path.display());
            let roller = FixedWindowRoller::builder().build(&roll_pattern, policy.keep_files)?;
            let trigger = SizeTrigger::new(policy.max_size_bytes);
            let compound = CompoundPolicy::new(Box::new(trigger), Box::new(roller));
            let appender = RollingFileAppender::builder()
                .encoder(encoder)
                .build(path, Box::new(compound))?;
            Ok(Box::new(appender))
        }
        None => {
            let appender = log4rs::append::file::FileAppender::builder()
                .encoder(encoder)
                .build(path)?;
            Ok(Box::new(appender))
        }
    }
}

/// Logs a command line at debug level before it is spawned.
pub fn log_command(cmd: &Command) {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<_> = cmd.get_args().map(|arg| arg.to_string_lossy()).collect();

    debug!("Executing command: {} {}", program, args.join(" "));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_rotating_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: LevelFilter::Debug,
            console: true,
            log_file: Some(dir.path().join("logs").join("arena.log")),
            rotation: Some(RotationPolicy::default()),
        };

        let built = config.build().unwrap();
        assert_eq!(built.appenders().len(), 2);
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn test_build_without_destinations() {
        let built = LoggingConfig::default().build().unwrap();
        assert!(built.appenders().is_empty());
    }
}
