// ============================================================================
// arena-cli/src/config.rs
// ============================================================================
//
// USER CONFIGURATION: Persistent defaults in ~/.arena/config.json
//
// The config file stores where the engine lives, which interpreter runs it,
// and defaults for the process command. Precedence, highest first:
// command-line flags and their environment variables, then this file, then
// the built-in defaults.
//
// A missing file is not an error; a file that cannot be parsed is reported
// as INVALID_CONFIG.
//
// AI-ASSISTANT-INFO: User config file loading, saving, and merging

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use arena_core::config::EngineConfig;
use arena_core::error::{ArenaError, ArenaResult, PreflightCode};
use arena_core::logging::{LoggingConfig, RotationPolicy};
use log::{LevelFilter, debug};
use serde::{Deserialize, Serialize};

/// Directory under the home directory holding config and logs.
pub const ARENA_DIR_NAME: &str = ".arena";

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Output directory used when neither the flag nor the file sets one.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

const DEFAULT_LOG_MAX_SIZE_MB: u64 = 5;
const DEFAULT_LOG_KEEP_FILES: u32 = 3;

/// Contents of the user config file. Every field is optional on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Engine install directory.
    pub engine_path: Option<PathBuf>,
    /// Python executable that runs the engine.
    pub python: Option<String>,
    /// Default output directory for `arena process`.
    pub output_dir: Option<PathBuf>,
    /// Default number of clips.
    pub clip_count: Option<u32>,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// One of error, warn, info, debug, trace.
    pub level: String,
    /// Log file; defaults to ~/.arena/logs/arena.log.
    pub file: Option<PathBuf>,
    pub max_size_mb: u64,
    pub keep_files: u32,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_size_mb: DEFAULT_LOG_MAX_SIZE_MB,
            keep_files: DEFAULT_LOG_KEEP_FILES,
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            engine_path: None,
            python: None,
            output_dir: None,
            clip_count: None,
            log: LogSettings::default(),
        }
    }
}

/// `~/.arena`, or `.arena` in the working directory when there is no home.
pub fn arena_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(ARENA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(ARENA_DIR_NAME))
}

pub fn config_path() -> PathBuf {
    arena_dir().join(CONFIG_FILE_NAME)
}

pub fn default_log_file() -> PathBuf {
    arena_dir().join("logs").join("arena.log")
}

impl UserConfig {
    /// Loads the config from its default location.
    pub fn load() -> ArenaResult<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> ArenaResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ArenaError::preflight(
                    PreflightCode::InvalidConfig,
                    format!("Cannot read config file {}: {e}", path.display()),
                ));
            }
        };

        serde_json::from_str(&text).map_err(|e| {
            ArenaError::preflight(
                PreflightCode::InvalidConfig,
                format!("Config file {} is not valid: {e}", path.display()),
            )
            .with_suggestion("Fix the JSON or recreate it with 'arena config init --force'")
        })
    }

    /// Writes the config as pretty-printed JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json + "\n")?;
        Ok(())
    }

    /// Engine settings after applying overrides on top of this file.
    ///
    /// `engine_path` and `python` come from flags or their environment
    /// variables and win over the file.
    pub fn engine_config(&self, engine_path: Option<&Path>, python: Option<&str>) -> EngineConfig {
        let mut builder = EngineConfig::builder();
        if let Some(dir) = engine_path.or(self.engine_path.as_deref()) {
            builder = builder.engine_dir(dir);
        }
        if let Some(python) = python.or(self.python.as_deref()) {
            builder = builder.python(python);
        }
        builder.build()
    }

    /// Output directory: the flag, then the file, then `./output`.
    pub fn output_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.or(self.output_dir.as_deref())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    /// Clip count: the flag, then the file, else left to the engine.
    pub fn clip_count(&self, flag: Option<u32>) -> Option<u32> {
        flag.or(self.clip_count)
    }

    /// Logging setup for this run.
    ///
    /// `--debug` forces debug level; `--verbose` or `--debug` also mirror
    /// log records to the terminal.
    pub fn logging_config(&self, verbose: bool, debug: bool) -> LoggingConfig {
        let level = if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::from_str(&self.log.level).unwrap_or(LevelFilter::Info)
        };
        LoggingConfig {
            level,
            console: verbose || debug,
            log_file: Some(self.log.file.clone().unwrap_or_else(default_log_file)),
            rotation: Some(RotationPolicy {
                max_size_bytes: self.log.max_size_mb.saturating_mul(1024 * 1024),
                keep_files: self.log.keep_files,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = UserConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, UserConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"clip_count": 4, "log": {"level": "debug"}}"#).unwrap();

        let config = UserConfig::load_from(&path).unwrap();
        assert_eq!(config.clip_count, Some(4));
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.keep_files, DEFAULT_LOG_KEEP_FILES);
        assert_eq!(config.engine_path, None);
    }

    #[test]
    fn test_malformed_file_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = UserConfig::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
        assert!(err.is_preflight());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = UserConfig {
            python: Some("python3.12".to_string()),
            output_dir: Some(PathBuf::from("/tmp/clips")),
            ..UserConfig::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(UserConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let config = UserConfig {
            engine_path: Some(PathBuf::from("/from/file")),
            python: Some("file-python".to_string()),
            output_dir: Some(PathBuf::from("file-out")),
            clip_count: Some(7),
            ..UserConfig::default()
        };

        let engine = config.engine_config(Some(Path::new("/from/flag")), None);
        assert_eq!(engine.engine_dir, PathBuf::from("/from/flag"));
        assert_eq!(engine.python, "file-python");

        assert_eq!(config.output_dir(None), PathBuf::from("file-out"));
        assert_eq!(config.output_dir(Some(Path::new("flag-out"))), PathBuf::from("flag-out"));
        assert_eq!(config.clip_count(None), Some(7));
        assert_eq!(config.clip_count(Some(2)), Some(2));
        assert_eq!(
            UserConfig::default().output_dir(None),
            PathBuf::from(DEFAULT_OUTPUT_DIR)
        );
    }

    #[test]
    fn test_logging_config_levels() {
        let config = UserConfig::default();

        let normal = config.logging_config(false, false);
        assert_eq!(normal.level, LevelFilter::Info);
        assert!(!normal.console);
        assert!(normal.log_file.is_some());

        let debug = config.logging_config(false, true);
        assert_eq!(debug.level, LevelFilter::Debug);
        assert!(debug.console);

        let bogus = UserConfig {
            log: LogSettings {
                level: "loud".to_string(),
                ..LogSettings::default()
            },
            ..UserConfig::default()
        };
        assert_eq!(bogus.logging_config(true, false).level, LevelFilter::Info);
    }
}
