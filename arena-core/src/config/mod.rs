//! Engine location and invocation settings.
//!
//! [`EngineConfig`] says where the external engine is installed and how to
//! launch it. Defaults can be overridden through environment variables and
//! then by explicit builder calls.

mod builder;
mod utils;

use std::path::PathBuf;

pub use builder::EngineConfigBuilder;
pub use utils::{get_env_path, get_env_string};

/// Default Python executable used to run the engine.
pub const DEFAULT_PYTHON: &str = if cfg!(windows) { "python" } else { "python3" };

/// Default engine install directory, relative to the working directory.
pub const DEFAULT_ENGINE_DIR: &str = "engine";

/// Engine entry script, relative to the engine directory.
pub const DEFAULT_ENTRYPOINT: &str = "arena/main.py";

/// Module run with `-m` for the platform-formatting command.
pub const DEFAULT_FORMAT_MODULE: &str = "arena.cli.main";

/// Environment variable that points the engine at its own modules.
pub const DEFAULT_MODULE_PATH_VAR: &str = "PYTHONPATH";

/// Module imported by the dependency probe.
pub const DEFAULT_PROBE_MODULE: &str = "arena";

/// Environment variable overriding the engine directory.
pub const ENV_ENGINE_PATH: &str = "ARENA_ENGINE_PATH";

/// Environment variable overriding the Python executable.
pub const ENV_PYTHON: &str = "ARENA_PYTHON";

/// How to locate and launch the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Interpreter that runs the engine entry script.
    pub python: String,

    /// Engine install directory; used as the child's working directory.
    pub engine_dir: PathBuf,

    /// Entry script, relative to `engine_dir` unless absolute.
    pub entrypoint: PathBuf,

    /// Module that provides the `format` command, launched as
    /// `python -m <format_module>`.
    pub format_module: String,

    /// Variable set to `engine_dir` in the child's environment.
    pub module_path_var: String,

    /// Module the dependency probe tries to import.
    pub probe_module: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            python: get_env_string(ENV_PYTHON, DEFAULT_PYTHON.to_string()),
            engine_dir: get_env_path(ENV_ENGINE_PATH, PathBuf::from(DEFAULT_ENGINE_DIR)),
            entrypoint: PathBuf::from(DEFAULT_ENTRYPOINT),
            format_module: DEFAULT_FORMAT_MODULE.to_string(),
            module_path_var: DEFAULT_MODULE_PATH_VAR.to_string(),
            probe_module: DEFAULT_PROBE_MODULE.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Engine directory made absolute against the current directory.
    ///
    /// The child runs inside this directory, so relative paths handed to it
    /// must not depend on the parent's working directory.
    pub fn resolved_engine_dir(&self) -> PathBuf {
        std::path::absolute(&self.engine_dir).unwrap_or_else(|_| self.engine_dir.clone())
    }

    /// Absolute path of the entry script.
    pub fn entrypoint_path(&self) -> PathBuf {
        if self.entrypoint.is_absolute() {
            self.entrypoint.clone()
        } else {
            self.resolved_engine_dir().join(&self.entrypoint)
        }
    }
}
