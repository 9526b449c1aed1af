// ============================================================================
// arena-core/src/reporting.rs
// ============================================================================
//
// ERROR REPORTING: Turning caught errors into user-facing reports
//
// Every failure shown to the user has the same shape: a title looked up from
// the error kind and code, the message, an optional suggestion and docs link,
// and (in debug mode only) the cause chain and a backtrace underneath. Errors outside the
// taxonomy are reported as "Unexpected Error" with no code.
//
// This module also maps engine failures (`BridgeError`) onto the taxonomy by
// inspecting the exit code and the stderr text the engine left behind.
//
// AI-ASSISTANT-INFO: Error titles, help blocks, report formatting, bridge failure classification

use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::{
    ArenaError, BridgeError, ErrorKind, PreflightCode, ProcessingCode, SystemCode, classify,
};
use crate::util::is_transient_error;

/// Title used for errors outside the taxonomy.
pub const UNEXPECTED_TITLE: &str = "Unexpected Error";

/// Detail line that introduces the backtrace in debug reports.
pub const BACKTRACE_HEADER: &str = "Backtrace:";

static TITLES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("FILE_NOT_FOUND", "Video File Not Found"),
        ("FILE_NOT_READABLE", "Cannot Read Video File"),
        ("INVALID_FILE_TYPE", "Unsupported File Type"),
        ("OUTPUT_NOT_WRITABLE", "Cannot Write Output"),
        ("INVALID_OPTION", "Invalid Option"),
        ("MISSING_API_KEY", "OpenAI API Key Missing"),
        ("INVALID_API_KEY", "Invalid OpenAI API Key"),
        ("PYTHON_NOT_FOUND", "Python Not Found"),
        ("DEPENDENCIES_MISSING", "Engine Dependencies Missing"),
        ("INVALID_CONFIG", "Invalid Configuration"),
        ("TRANSCRIPTION_FAILED", "Transcription Failed"),
        ("ANALYSIS_FAILED", "AI Analysis Failed"),
        ("CLIP_GENERATION_FAILED", "Clip Generation Failed"),
        ("FORMAT_FAILED", "Platform Formatting Failed"),
        ("RATE_LIMIT", "API Rate Limit Reached"),
        ("API_ERROR", "API Error"),
        ("TIMEOUT", "Operation Timed Out"),
        ("NO_CLIPS_GENERATED", "No Clips Generated"),
        ("ENGINE_FAILED", "Engine Failed"),
        ("DISK_FULL", "Disk Full"),
        ("PERMISSION_DENIED", "Permission Denied"),
        ("NETWORK_ERROR", "Network Error"),
        ("OUT_OF_MEMORY", "Out of Memory"),
        ("PROCESS_CRASHED", "Engine Crashed"),
        ("CANCELLED", "Cancelled"),
    ])
});

static HELP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "MISSING_API_KEY",
            "To set your OpenAI API key:\n\
             \x20 1. Get a key at https://platform.openai.com/api-keys\n\
             \x20 2. export OPENAI_API_KEY=\"sk-...\"\n\
             \x20 3. Add the export to your shell profile to keep it",
        ),
        (
            "INVALID_API_KEY",
            "OpenAI API keys start with \"sk-\" and are at least 20 characters.\n\
             \x20 1. Check for stray quotes or whitespace in OPENAI_API_KEY\n\
             \x20 2. Create a new key at https://platform.openai.com/api-keys",
        ),
        (
            "PYTHON_NOT_FOUND",
            "The engine needs Python 3.8 or newer:\n\
             \x20 macOS:   brew install python\n\
             \x20 Ubuntu:  sudo apt install python3\n\
             \x20 Windows: https://www.python.org/downloads/\n\
             Set ARENA_PYTHON if the interpreter has a different name.",
        ),
        (
            "DEPENDENCIES_MISSING",
            "Install the engine's Python dependencies:\n\
             \x20 cd <engine dir> && pip install -e .\n\
             Set ARENA_ENGINE_PATH if the engine lives elsewhere.",
        ),
        (
            "RATE_LIMIT",
            "The OpenAI API is throttling requests:\n\
             \x20 1. Wait a minute and run the command again\n\
             \x20 2. Use --editorial-model gpt-4o-mini for lighter usage\n\
             \x20 3. Check your usage limits at https://platform.openai.com/usage",
        ),
        (
            "DISK_FULL",
            "Free up disk space:\n\
             \x20 1. Remove old clips from the output directory\n\
             \x20 2. Clear the engine cache (run once with --no-cache)\n\
             \x20 3. Choose another output directory with -o",
        ),
        (
            "OUT_OF_MEMORY",
            "The engine ran out of memory:\n\
             \x20 1. Close other applications\n\
             \x20 2. Try --fast to use lighter models\n\
             \x20 3. Split long videos into shorter parts",
        ),
        (
            "INVALID_FILE_TYPE",
            "Supported formats: mp4, mov, avi, mkv, webm, m4v, flv, wmv.\n\
             Convert other formats first, e.g. ffmpeg -i input.ext output.mp4",
        ),
    ])
});

/// Fixed title for a kind and code. Unknown codes get the kind's fallback.
pub fn error_title(kind: ErrorKind, code: &str) -> &'static str {
    TITLES.get(code).copied().unwrap_or(match kind {
        ErrorKind::Preflight => "Pre-flight Check Failed",
        ErrorKind::Processing => "Processing Failed",
        ErrorKind::System => "System Error",
    })
}

/// Longer remediation block for a code, if one exists.
pub fn help_text(code: &str) -> Option<&'static str> {
    HELP.get(code).copied()
}

/// A formatted, fixed-structure error display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub title: String,
    pub kind: Option<ErrorKind>,
    /// `None` for errors outside the taxonomy.
    pub code: Option<&'static str>,
    pub message: String,
    pub suggestion: Option<String>,
    pub docs_url: Option<String>,
    /// Extended remediation block, filled by [`ErrorReport::with_help`].
    pub help: Option<&'static str>,
    /// Cause chain and backtrace; only collected in debug mode.
    pub details: Vec<String>,
}

impl ErrorReport {
    pub fn from_arena(error: &ArenaError) -> Self {
        Self {
            title: error_title(error.kind(), error.code()).to_string(),
            kind: Some(error.kind()),
            code: Some(error.code()),
            message: error.message().to_string(),
            suggestion: error.suggestion().map(str::to_string),
            docs_url: error.docs_url().map(str::to_string),
            help: None,
            details: Vec::new(),
        }
    }

    /// Builds a report for any caught error.
    ///
    /// With `debug` set, the full cause chain and a backtrace are kept as
    /// details underneath the message. The backtrace is the one captured
    /// with the error when there is one, otherwise one taken here.
    pub fn from_error(error: &anyhow::Error, debug: bool) -> Self {
        let mut report = match classify(error) {
            Some(arena) => Self::from_arena(arena),
            None => Self {
                title: UNEXPECTED_TITLE.to_string(),
                kind: None,
                code: None,
                message: error.to_string(),
                suggestion: None,
                docs_url: None,
                help: None,
                details: Vec::new(),
            },
        };

        if debug {
            report.details = error
                .chain()
                .map(|cause| cause.to_string())
                .filter(|text| *text != report.message)
                .map(|text| format!("Caused by: {text}"))
                .collect();
            let backtrace = error.backtrace();
            let frames = if backtrace.status() == BacktraceStatus::Captured {
                backtrace.to_string()
            } else {
                Backtrace::force_capture().to_string()
            };
            report.details.push(BACKTRACE_HEADER.to_string());
            report.details.extend(frames.lines().map(str::to_string));
        }
        report
    }

    /// Adds the code-specific help block. Unknown codes leave the report as is.
    #[must_use]
    pub fn with_help(mut self) -> Self {
        self.help = self.code.and_then(help_text);
        self
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "✗ {}", self.title)?;
        writeln!(f, "  {}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            writeln!(f, "  → {suggestion}")?;
        }
        if let Some(url) = &self.docs_url {
            writeln!(f, "  Docs: {url}")?;
        }
        if let Some(help) = self.help {
            writeln!(f)?;
            for line in help.lines() {
                writeln!(f, "  {line}")?;
            }
        }
        for line in &self.details {
            writeln!(f, "    {line}")?;
        }
        Ok(())
    }
}

/// Formats several errors as one numbered summary.
pub fn summarize_errors(errors: &[ArenaError]) -> String {
    match errors {
        [] => "No errors".to_string(),
        [single] => ErrorReport::from_arena(single).to_string(),
        many => {
            let mut out = format!("{} errors found:\n", many.len());
            for (i, error) in many.iter().enumerate() {
                out.push_str(&format!(
                    "  {}. [{}] {}\n",
                    i + 1,
                    error.code(),
                    error.message()
                ));
                if let Some(suggestion) = error.suggestion() {
                    out.push_str(&format!("     → {suggestion}\n"));
                }
            }
            out
        }
    }
}

/// Maps an engine failure onto the taxonomy.
///
/// Exit failures are classified from stderr content first and the exit
/// code second; anything unrecognized becomes `ENGINE_FAILED`.
pub fn classify_bridge_failure(error: &BridgeError) -> ArenaError {
    match error {
        BridgeError::FailedToStart { program, source } => match source.kind() {
            std::io::ErrorKind::NotFound => ArenaError::preflight(
                PreflightCode::PythonNotFound,
                format!("Could not find '{program}' to start the engine"),
            )
            .with_suggestion("Install Python 3.8+ or set ARENA_PYTHON"),
            std::io::ErrorKind::PermissionDenied => ArenaError::system(
                SystemCode::PermissionDenied,
                format!("Not allowed to run '{program}': {source}"),
            ),
            _ => ArenaError::system(
                SystemCode::ProcessCrashed,
                format!("Failed to start the engine: {source}"),
            ),
        },
        BridgeError::Cancelled => {
            ArenaError::system(SystemCode::Cancelled, "Processing was cancelled")
        }
        BridgeError::Wait(source) => ArenaError::system(
            SystemCode::ProcessCrashed,
            format!("Lost track of the engine process: {source}"),
        ),
        BridgeError::ExitedWithError { code, stderr } => classify_exit(*code, stderr),
    }
}

fn classify_exit(code: i32, stderr: &str) -> ArenaError {
    let lower = stderr.to_lowercase();
    let has = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));
    let message = format!("Engine exited with code {code}: {}", stderr_summary(stderr));

    if has(&["rate limit", "ratelimit", "too many requests", "429"]) {
        ArenaError::processing(ProcessingCode::RateLimit, message)
            .with_suggestion("Wait a minute and try again")
    } else if has(&["no space left", "disk full", "enospc"]) {
        ArenaError::system(SystemCode::DiskFull, message)
            .with_suggestion("Free up disk space or choose another output directory")
    } else if has(&["permission denied", "eacces", "operation not permitted"]) {
        ArenaError::system(SystemCode::PermissionDenied, message)
            .with_suggestion("Check permissions on the input file and output directory")
    } else if has(&["memoryerror", "out of memory", "cannot allocate memory"]) {
        ArenaError::system(SystemCode::OutOfMemory, message)
            .with_suggestion("Close other applications or try --fast")
    } else if code >= 128 {
        ArenaError::system(SystemCode::ProcessCrashed, message)
    } else if has(&["timeout", "timed out"]) {
        ArenaError::processing(ProcessingCode::Timeout, message)
            .with_suggestion("Check your connection and try again")
    } else if is_transient_error(&lower) {
        ArenaError::system(SystemCode::NetworkError, message)
            .with_suggestion("Check your internet connection and try again")
    } else if has(&["openai", "api error", "apierror", "authentication"]) {
        ArenaError::processing(ProcessingCode::ApiError, message)
            .with_suggestion("Verify OPENAI_API_KEY and your account status")
    } else if has(&["transcri", "whisper"]) {
        ArenaError::processing(ProcessingCode::TranscriptionFailed, message)
    } else if has(&["analy"]) {
        ArenaError::processing(ProcessingCode::AnalysisFailed, message)
    } else if has(&["clip"]) {
        ArenaError::processing(ProcessingCode::ClipGenerationFailed, message)
    } else {
        ArenaError::processing(ProcessingCode::EngineFailed, message)
            .with_suggestion("Run with --debug for the full engine output")
    }
}

/// The most useful single line of engine stderr.
///
/// The engine prefixes its own failure messages with `ERROR:`; otherwise the
/// last non-empty line is used.
fn stderr_summary(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    lines
        .iter()
        .rev()
        .find_map(|line| line.strip_prefix("ERROR:"))
        .or_else(|| lines.last().copied())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "no error output".to_string())
}
