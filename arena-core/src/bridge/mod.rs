// ============================================================================
// arena-core/src/bridge/mod.rs
// ============================================================================
//
// PROCESS BRIDGE: Launching and supervising the external engine
//
// The bridge owns the contract with the engine: the argument grammar it is
// launched with, the stdout protocol it speaks, and how its exit is turned
// into a single result. Failures are reported as `BridgeError`; mapping them
// onto the user-facing taxonomy is left to the caller.
//
// KEY COMPONENTS:
// - ProcessBridge: spawns engine runs and environment probes
// - EngineRun: event stream plus exactly-once settlement for one run
// - CancellationToken: aborts a run by killing the child
//
// AI-ASSISTANT-INFO: Engine subprocess bridge, stdout protocol, cancellation

pub mod cancel;
pub mod options;
pub mod protocol;
pub mod supervisor;

use std::ffi::OsString;
use std::process::{Command, Stdio};
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{AttemptError, BridgeError, BridgeResult, CommandError};
use crate::logging;
use crate::util::{
    RetryOptions, SpawnOptions, retry_with_backoff, spawn_with_error_handling, with_timeout,
};

pub use cancel::CancellationToken;
pub use options::{
    CropStrategy, EditorialModel, FormatOptions, PadStrategy, ParseOptionError, Platform,
    ProcessOptions,
};
pub use protocol::{ProgressEvent, StreamDecoder, parse_line};
pub use supervisor::EngineRun;

/// Marker printed by the dependency probe when the import succeeds.
pub const DEPENDENCY_MARKER: &str = "ARENA_OK";

/// Upper bound for the environment and dependency probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts for the dependency probe, including the first.
const DEPENDENCY_PROBE_ATTEMPTS: u32 = 2;

const DEPENDENCY_RETRY_DELAY: Duration = Duration::from_millis(500);

const PYTHON_NOT_FOUND: &str = "Python not found. Please install Python 3.8 or higher.";

/// Outcome of [`ProcessBridge::check_environment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentStatus {
    pub available: bool,
    /// Runtime version, e.g. `3.11.4`.
    pub version: Option<String>,
    pub error: Option<String>,
}

/// Outcome of [`ProcessBridge::check_dependencies`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStatus {
    pub installed: bool,
    /// Module names the probe reported as missing, when it could tell.
    pub missing: Vec<String>,
}

/// Launches the engine described by an [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct ProcessBridge {
    config: EngineConfig,
}

impl ProcessBridge {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts a clip-generation run.
    ///
    /// Returns [`BridgeError::FailedToStart`] when the engine cannot be
    /// spawned; no events are produced in that case.
    pub fn run_process(
        &self,
        options: &ProcessOptions,
        cancel: CancellationToken,
    ) -> BridgeResult<EngineRun> {
        info!("Starting engine for {}", options.video_path.display());
        let launcher = vec![self.config.entrypoint_path().into_os_string()];
        self.spawn_engine(launcher, options.to_args(), cancel)
    }

    /// Starts a platform-formatting run.
    ///
    /// The `format` command lives in a package module rather than the entry
    /// script, so it is launched with `-m`.
    pub fn run_format(
        &self,
        options: &FormatOptions,
        cancel: CancellationToken,
    ) -> BridgeResult<EngineRun> {
        info!(
            "Starting engine formatter for {} ({})",
            options.input.display(),
            options.platform
        );
        let launcher = vec![
            OsString::from("-m"),
            OsString::from(&self.config.format_module),
        ];
        self.spawn_engine(launcher, options.to_args(), cancel)
    }

    fn spawn_engine(
        &self,
        launcher: Vec<OsString>,
        args: Vec<String>,
        cancel: CancellationToken,
    ) -> BridgeResult<EngineRun> {
        let engine_dir = self.config.resolved_engine_dir();
        let mut cmd = Command::new(&self.config.python);
        cmd.args(&launcher)
            .args(&args)
            .current_dir(&engine_dir)
            .env(&self.config.module_path_var, &engine_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        logging::log_command(&cmd);

        let child = cmd.spawn().map_err(|e| {
            warn!("Failed to start engine with '{}': {e}", self.config.python);
            BridgeError::FailedToStart {
                program: self.config.python.clone(),
                source: e,
            }
        })?;
        debug!("Engine started with pid {}", child.id());

        Ok(EngineRun::start(child, cancel))
    }

    /// Probes the engine runtime. Never fails; problems are reported in the
    /// returned status.
    pub fn check_environment(&self) -> EnvironmentStatus {
        let python = self.config.python.clone();
        let probe = with_timeout(PROBE_TIMEOUT, move || {
            spawn_with_error_handling(&python, &["--version".to_string()], SpawnOptions::new())
        });

        match probe {
            Ok(Ok(output)) if output.success() => {
                // Older interpreters print the version on stderr.
                let text = if output.stdout.trim().is_empty() {
                    &output.stderr
                } else {
                    &output.stdout
                };
                EnvironmentStatus {
                    available: true,
                    version: parse_version(text),
                    error: None,
                }
            }
            other => {
                debug!("Runtime probe failed: {other:?}");
                EnvironmentStatus {
                    available: false,
                    version: None,
                    error: Some(PYTHON_NOT_FOUND.to_string()),
                }
            }
        }
    }

    /// Checks that the engine's core module can be imported.
    ///
    /// The probe is retried once, since the first import after installation
    /// can be slow enough to hit the timeout.
    pub fn check_dependencies(&self) -> DependencyStatus {
        let python = self.config.python.clone();
        let args = vec![
            "-c".to_string(),
            format!(
                "import {}; print('{DEPENDENCY_MARKER}')",
                self.config.probe_module
            ),
        ];
        let engine_dir = self.config.resolved_engine_dir();
        let module_path_var = self.config.module_path_var.clone();
        let retry = RetryOptions::new()
            .with_max_attempts(DEPENDENCY_PROBE_ATTEMPTS)
            .with_delay(DEPENDENCY_RETRY_DELAY)
            .with_timeout(Some(PROBE_TIMEOUT));
        let on_retry = |attempt: u32, err: &AttemptError<CommandError>| {
            warn!("Dependency probe attempt {attempt} failed: {err}");
        };

        let probe = retry_with_backoff(
            move || {
                let options = SpawnOptions::new()
                    .current_dir(&engine_dir)
                    .env(module_path_var.clone(), engine_dir.display().to_string());
                spawn_with_error_handling(&python, &args, options)
            },
            &retry,
            Some(&on_retry),
        );

        match probe {
            Ok(output) if output.success() && output.stdout.contains(DEPENDENCY_MARKER) => {
                DependencyStatus {
                    installed: true,
                    missing: Vec::new(),
                }
            }
            Ok(output) => DependencyStatus {
                installed: false,
                missing: missing_modules(&output.stderr),
            },
            Err(e) => {
                debug!("Dependency probe failed: {e}");
                DependencyStatus {
                    installed: false,
                    missing: Vec::new(),
                }
            }
        }
    }
}

/// Extracts `3.11.4` from `Python 3.11.4`.
fn parse_version(text: &str) -> Option<String> {
    text.split_whitespace()
        .find(|word| word.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

/// Collects module names from `No module named 'x'` messages.
fn missing_modules(stderr: &str) -> Vec<String> {
    const NEEDLE: &str = "No module named ";
    stderr
        .lines()
        .filter_map(|line| {
            let rest = &line[line.find(NEEDLE)? + NEEDLE.len()..];
            let name = rest.trim().trim_matches(|c| c == '\'' || c == '"');
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}
