// ============================================================================
// arena-cli/src/preflight.rs
// ============================================================================
//
// PRE-FLIGHT VALIDATION: Checks run before the engine is started
//
// Every check is evaluated, in a fixed order, before any subprocess is
// spawned for the run itself. Only the first failure is surfaced to the
// user; the full list is logged at debug level.
//
// AI-ASSISTANT-INFO: Input, output, option, API key, and engine checks

use std::fs::{self, File};
use std::path::Path;

use arena_core::bridge::{DependencyStatus, EnvironmentStatus, ProcessBridge, ProcessOptions};
use arena_core::error::{ArenaError, ArenaResult, PreflightCode};
use arena_core::reporting::summarize_errors;
use arena_core::utils::{VIDEO_EXTENSIONS, has_video_extension};
use log::{debug, info};

/// Environment variable holding the OpenAI API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

pub const API_KEY_PREFIX: &str = "sk-";
pub const API_KEY_MIN_LEN: usize = 20;

pub const MAX_CLIP_COUNT: u32 = 50;

/// Name of the scratch file used to prove the output directory is writable.
const WRITE_PROBE: &str = ".arena-write-test";

/// Checks the input video: exists, is a file, can be opened, known extension.
pub fn check_input_file(path: &Path) -> ArenaResult<()> {
    if !path.exists() {
        return Err(ArenaError::preflight(
            PreflightCode::FileNotFound,
            format!("Video file not found: {}", path.display()),
        )
        .with_suggestion("Check the path and try again"));
    }
    if !path.is_file() {
        return Err(ArenaError::preflight(
            PreflightCode::FileNotReadable,
            format!("Not a file: {}", path.display()),
        )
        .with_suggestion("Pass a video file, not a directory"));
    }
    if let Err(e) = File::open(path) {
        return Err(ArenaError::preflight(
            PreflightCode::FileNotReadable,
            format!("Cannot read {}: {e}", path.display()),
        )
        .with_suggestion("Check the file permissions"));
    }
    if !has_video_extension(path) {
        return Err(ArenaError::preflight(
            PreflightCode::InvalidFileType,
            format!("Unsupported file type: {}", path.display()),
        )
        .with_suggestion(format!("Use one of: {}", VIDEO_EXTENSIONS.join(", "))));
    }
    Ok(())
}

/// Creates the output directory if needed and proves it accepts writes.
pub fn check_output_dir(path: &Path) -> ArenaResult<()> {
    let not_writable = |detail: String| {
        ArenaError::preflight(
            PreflightCode::OutputNotWritable,
            format!("Cannot write to output directory {}: {detail}", path.display()),
        )
        .with_suggestion("Choose another directory with -o or fix its permissions")
    };

    fs::create_dir_all(path).map_err(|e| not_writable(e.to_string()))?;
    let probe = path.join(WRITE_PROBE);
    fs::write(&probe, b"").map_err(|e| not_writable(e.to_string()))?;
    if let Err(e) = fs::remove_file(&probe) {
        debug!("Could not remove {}: {e}", probe.display());
    }
    Ok(())
}

/// Sanity checks on the numeric options.
pub fn check_options(options: &ProcessOptions) -> ArenaResult<()> {
    let invalid = |message: String| ArenaError::preflight(PreflightCode::InvalidOption, message);

    if options.min_duration == Some(0) {
        return Err(invalid("--min must be a positive number of seconds".to_string()));
    }
    if options.max_duration == Some(0) {
        return Err(invalid("--max must be a positive number of seconds".to_string()));
    }
    if let (Some(min), Some(max)) = (options.min_duration, options.max_duration) {
        if min > max {
            return Err(invalid(format!(
                "--min ({min}s) cannot be greater than --max ({max}s)"
            ))
            .with_suggestion("Swap the values or widen the range"));
        }
    }
    if let Some(count) = options.clip_count {
        if !(1..=MAX_CLIP_COUNT).contains(&count) {
            return Err(invalid(format!(
                "--count must be between 1 and {MAX_CLIP_COUNT}, got {count}"
            )));
        }
    }
    if let Some(padding) = options.padding {
        if !padding.is_finite() || padding < 0.0 {
            return Err(invalid(format!(
                "--padding must be zero or more seconds, got {padding}"
            )));
        }
    }
    Ok(())
}

/// Checks the API key's presence and shape; it is never sent anywhere here.
pub fn check_api_key(key: Option<&str>) -> ArenaResult<()> {
    let key = key.map(str::trim).unwrap_or_default();
    if key.is_empty() {
        return Err(ArenaError::preflight(
            PreflightCode::MissingApiKey,
            format!("{API_KEY_VAR} is not set"),
        )
        .with_suggestion(format!("export {API_KEY_VAR}=\"sk-...\"")));
    }
    if !key.starts_with(API_KEY_PREFIX) || key.len() < API_KEY_MIN_LEN {
        return Err(ArenaError::preflight(
            PreflightCode::InvalidApiKey,
            format!("{API_KEY_VAR} does not look like an OpenAI API key"),
        )
        .with_suggestion(format!(
            "Keys start with \"{API_KEY_PREFIX}\" and are at least {API_KEY_MIN_LEN} characters"
        )));
    }
    Ok(())
}

/// Error for a runtime probe that did not find a usable interpreter.
pub fn runtime_failure(env: &EnvironmentStatus, python: &str) -> Option<ArenaError> {
    if env.available {
        return None;
    }
    let message = env
        .error
        .clone()
        .unwrap_or_else(|| format!("Could not run '{python}'"));
    Some(
        ArenaError::preflight(PreflightCode::PythonNotFound, message)
            .with_suggestion("Install Python 3.8+ or set ARENA_PYTHON"),
    )
}

/// Error for a dependency probe that could not import the engine.
pub fn dependency_failure(deps: &DependencyStatus, engine_dir: &Path) -> Option<ArenaError> {
    if deps.installed {
        return None;
    }
    let message = if deps.missing.is_empty() {
        format!("Engine modules could not be imported from {}", engine_dir.display())
    } else {
        format!("Missing Python modules: {}", deps.missing.join(", "))
    };
    Some(
        ArenaError::preflight(PreflightCode::DependenciesMissing, message)
            .with_suggestion("Install the engine dependencies or set ARENA_ENGINE_PATH"),
    )
}

/// Checks that the engine's runtime starts and its modules import.
pub fn check_engine(bridge: &ProcessBridge) -> ArenaResult<()> {
    let config = bridge.config();
    if let Some(err) = runtime_failure(&bridge.check_environment(), &config.python) {
        return Err(err);
    }
    match dependency_failure(&bridge.check_dependencies(), &config.engine_dir) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Runs every check and returns all failures, in check order.
pub fn collect_failures(
    options: &ProcessOptions,
    bridge: &ProcessBridge,
    api_key: Option<&str>,
) -> Vec<ArenaError> {
    [
        check_input_file(&options.video_path),
        check_output_dir(&options.output_dir),
        check_options(options),
        check_api_key(api_key),
        check_engine(bridge),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect()
}

/// Runs every check and fails with the first failure.
pub fn run_preflight(
    options: &ProcessOptions,
    bridge: &ProcessBridge,
    api_key: Option<&str>,
) -> ArenaResult<()> {
    let mut failures = collect_failures(options, bridge, api_key);
    if failures.is_empty() {
        info!("Pre-flight checks passed");
        return Ok(());
    }
    debug!("Pre-flight failures:\n{}", summarize_errors(&failures));
    Err(failures.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::config::EngineConfig;

    const GOOD_KEY: &str = "sk-abcdefghijklmnopqrstuvwxyz";

    #[test]
    fn test_input_file_checks() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.MP4");
        let notes = dir.path().join("notes.txt");
        fs::write(&video, b"").unwrap();
        fs::write(&notes, b"").unwrap();

        assert!(check_input_file(&video).is_ok());
        assert_eq!(
            check_input_file(&dir.path().join("missing.mp4")).unwrap_err().code(),
            "FILE_NOT_FOUND"
        );
        assert_eq!(check_input_file(dir.path()).unwrap_err().code(), "FILE_NOT_READABLE");
        assert_eq!(check_input_file(&notes).unwrap_err().code(), "INVALID_FILE_TYPE");
    }

    #[test]
    fn test_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b");

        check_output_dir(&out).unwrap();
        assert!(out.is_dir());
        assert!(!out.join(WRITE_PROBE).exists());
    }

    #[test]
    fn test_output_dir_under_a_file_is_not_writable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, b"").unwrap();

        let err = check_output_dir(&file.join("out")).unwrap_err();
        assert_eq!(err.code(), "OUTPUT_NOT_WRITABLE");
    }

    #[test]
    fn test_option_checks() {
        let base = ProcessOptions::new("v.mp4", "out");
        assert!(check_options(&base).is_ok());

        let cases = [
            ProcessOptions { min_duration: Some(0), ..base.clone() },
            ProcessOptions { max_duration: Some(0), ..base.clone() },
            ProcessOptions { min_duration: Some(60), max_duration: Some(30), ..base.clone() },
            ProcessOptions { clip_count: Some(0), ..base.clone() },
            ProcessOptions { clip_count: Some(51), ..base.clone() },
            ProcessOptions { padding: Some(-0.5), ..base.clone() },
            ProcessOptions { padding: Some(f64::NAN), ..base.clone() },
        ];
        for options in &cases {
            let err = check_options(options).unwrap_err();
            assert_eq!(err.code(), "INVALID_OPTION", "{options:?}");
        }

        let edges = ProcessOptions {
            min_duration: Some(30),
            max_duration: Some(30),
            clip_count: Some(50),
            padding: Some(0.0),
            ..base
        };
        assert!(check_options(&edges).is_ok());
    }

    #[test]
    fn test_api_key_checks() {
        assert!(check_api_key(Some(GOOD_KEY)).is_ok());
        assert_eq!(check_api_key(None).unwrap_err().code(), "MISSING_API_KEY");
        assert_eq!(check_api_key(Some("   ")).unwrap_err().code(), "MISSING_API_KEY");
        assert_eq!(
            check_api_key(Some("pk-abcdefghijklmnopqrstuvwxyz")).unwrap_err().code(),
            "INVALID_API_KEY"
        );
        assert_eq!(check_api_key(Some("sk-short")).unwrap_err().code(), "INVALID_API_KEY");
    }

    #[test]
    fn test_first_failure_wins() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = ProcessBridge::new(
            EngineConfig::builder()
                .python("definitely-not-a-real-python-xyz")
                .engine_dir(dir.path())
                .build(),
        );
        let options = ProcessOptions {
            clip_count: Some(99),
            ..ProcessOptions::new(dir.path().join("missing.mp4"), dir.path().join("out"))
        };

        let failures = collect_failures(&options, &bridge, None);
        let codes: Vec<_> = failures.iter().map(ArenaError::code).collect();
        assert_eq!(
            codes,
            vec!["FILE_NOT_FOUND", "INVALID_OPTION", "MISSING_API_KEY", "PYTHON_NOT_FOUND"]
        );

        let err = run_preflight(&options, &bridge, None).unwrap_err();
        assert_eq!(err.code(), "FILE_NOT_FOUND");
    }
}
