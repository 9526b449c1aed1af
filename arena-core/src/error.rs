// ============================================================================
// arena-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error taxonomy and supervision errors
//
// This module defines two families of errors:
//
// - ArenaError: the operator-facing taxonomy. Every failure the CLI reports
//   is one of three kinds (pre-flight, processing, system), each with a closed
//   code vocabulary, a message, and optional remediation hints.
// - BridgeError / CommandError / TimeoutError / AttemptError: the low-level
//   failures produced while spawning and supervising subprocesses. These are
//   never reclassified here; the orchestrator decides how they map onto the
//   taxonomy.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// ERROR CODES
// ============================================================================

/// The three disjoint error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Raised before any subprocess is started.
    Preflight,
    /// The engine ran but the operation failed semantically.
    Processing,
    /// Infrastructure failure (disk, permissions, network, memory, crash).
    System,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Preflight => "preflight",
            ErrorKind::Processing => "processing",
            ErrorKind::System => "system",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Codes raised by pre-flight validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreflightCode {
    FileNotFound,
    FileNotReadable,
    InvalidFileType,
    OutputNotWritable,
    InvalidOption,
    MissingApiKey,
    InvalidApiKey,
    PythonNotFound,
    DependenciesMissing,
    InvalidConfig,
}

/// Codes raised when the engine ran but failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingCode {
    TranscriptionFailed,
    AnalysisFailed,
    ClipGenerationFailed,
    FormatFailed,
    RateLimit,
    ApiError,
    Timeout,
    NoClipsGenerated,
    EngineFailed,
}

/// Codes raised for infrastructure failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemCode {
    DiskFull,
    PermissionDenied,
    NetworkError,
    OutOfMemory,
    ProcessCrashed,
    Cancelled,
}

/// Common behaviour of the per-kind code vocabularies.
pub trait ErrorCode: fmt::Debug + Copy + Eq {
    const KIND: ErrorKind;

    /// Machine-readable code string, e.g. `FILE_NOT_FOUND`.
    fn as_str(&self) -> &'static str;
}

impl ErrorCode for PreflightCode {
    const KIND: ErrorKind = ErrorKind::Preflight;

    fn as_str(&self) -> &'static str {
        match self {
            PreflightCode::FileNotFound => "FILE_NOT_FOUND",
            PreflightCode::FileNotReadable => "FILE_NOT_READABLE",
            PreflightCode::InvalidFileType => "INVALID_FILE_TYPE",
            PreflightCode::OutputNotWritable => "OUTPUT_NOT_WRITABLE",
            PreflightCode::InvalidOption => "INVALID_OPTION",
            PreflightCode::MissingApiKey => "MISSING_API_KEY",
            PreflightCode::InvalidApiKey => "INVALID_API_KEY",
            PreflightCode::PythonNotFound => "PYTHON_NOT_FOUND",
            PreflightCode::DependenciesMissing => "DEPENDENCIES_MISSING",
            PreflightCode::InvalidConfig => "INVALID_CONFIG",
        }
    }
}

impl ErrorCode for ProcessingCode {
    const KIND: ErrorKind = ErrorKind::Processing;

    fn as_str(&self) -> &'static str {
        match self {
            ProcessingCode::TranscriptionFailed => "TRANSCRIPTION_FAILED",
            ProcessingCode::AnalysisFailed => "ANALYSIS_FAILED",
            ProcessingCode::ClipGenerationFailed => "CLIP_GENERATION_FAILED",
            ProcessingCode::FormatFailed => "FORMAT_FAILED",
            ProcessingCode::RateLimit => "RATE_LIMIT",
            ProcessingCode::ApiError => "API_ERROR",
            ProcessingCode::Timeout => "TIMEOUT",
            ProcessingCode::NoClipsGenerated => "NO_CLIPS_GENERATED",
            ProcessingCode::EngineFailed => "ENGINE_FAILED",
        }
    }
}

impl ErrorCode for SystemCode {
    const KIND: ErrorKind = ErrorKind::System;

    fn as_str(&self) -> &'static str {
        match self {
            SystemCode::DiskFull => "DISK_FULL",
            SystemCode::PermissionDenied => "PERMISSION_DENIED",
            SystemCode::NetworkError => "NETWORK_ERROR",
            SystemCode::OutOfMemory => "OUT_OF_MEMORY",
            SystemCode::ProcessCrashed => "PROCESS_CRASHED",
            SystemCode::Cancelled => "CANCELLED",
        }
    }
}

// ============================================================================
// ARENA ERROR TAXONOMY
// ============================================================================

/// Payload shared by every taxonomy error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetails<C> {
    pub code: C,
    pub message: String,
    pub suggestion: Option<String>,
    pub docs_url: Option<String>,
}

impl<C> ErrorDetails<C> {
    fn new(code: C, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestion: None,
            docs_url: None,
        }
    }
}

/// Operator-facing error taxonomy.
///
/// The variant fixes the kind for the lifetime of the value; the code type
/// of each variant restricts it to that kind's vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("{}", .0.message)]
    Preflight(ErrorDetails<PreflightCode>),

    #[error("{}", .0.message)]
    Processing(ErrorDetails<ProcessingCode>),

    #[error("{}", .0.message)]
    System(ErrorDetails<SystemCode>),
}

impl ArenaError {
    pub fn preflight(code: PreflightCode, message: impl Into<String>) -> Self {
        ArenaError::Preflight(ErrorDetails::new(code, message))
    }

    pub fn processing(code: ProcessingCode, message: impl Into<String>) -> Self {
        ArenaError::Processing(ErrorDetails::new(code, message))
    }

    pub fn system(code: SystemCode, message: impl Into<String>) -> Self {
        ArenaError::System(ErrorDetails::new(code, message))
    }

    /// Attaches an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        let suggestion = Some(suggestion.into());
        match &mut self {
            ArenaError::Preflight(d) => d.suggestion = suggestion,
            ArenaError::Processing(d) => d.suggestion = suggestion,
            ArenaError::System(d) => d.suggestion = suggestion,
        }
        self
    }

    /// Attaches a documentation link.
    #[must_use]
    pub fn with_docs_url(mut self, url: impl Into<String>) -> Self {
        let url = Some(url.into());
        match &mut self {
            ArenaError::Preflight(d) => d.docs_url = url,
            ArenaError::Processing(d) => d.docs_url = url,
            ArenaError::System(d) => d.docs_url = url,
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ArenaError::Preflight(_) => ErrorKind::Preflight,
            ArenaError::Processing(_) => ErrorKind::Processing,
            ArenaError::System(_) => ErrorKind::System,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ArenaError::Preflight(d) => d.code.as_str(),
            ArenaError::Processing(d) => d.code.as_str(),
            ArenaError::System(d) => d.code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ArenaError::Preflight(d) => &d.message,
            ArenaError::Processing(d) => &d.message,
            ArenaError::System(d) => &d.message,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ArenaError::Preflight(d) => d.suggestion.as_deref(),
            ArenaError::Processing(d) => d.suggestion.as_deref(),
            ArenaError::System(d) => d.suggestion.as_deref(),
        }
    }

    pub fn docs_url(&self) -> Option<&str> {
        match self {
            ArenaError::Preflight(d) => d.docs_url.as_deref(),
            ArenaError::Processing(d) => d.docs_url.as_deref(),
            ArenaError::System(d) => d.docs_url.as_deref(),
        }
    }

    pub fn is_preflight(&self) -> bool {
        matches!(self, ArenaError::Preflight(_))
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, ArenaError::Processing(_))
    }

    pub fn is_system(&self) -> bool {
        matches!(self, ArenaError::System(_))
    }
}

/// Finds a taxonomy error anywhere in the cause chain of `error`.
///
/// Returns `None` for native or arbitrary errors, which are reported as
/// unexpected.
pub fn classify(error: &anyhow::Error) -> Option<&ArenaError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ArenaError>())
}

// ============================================================================
// SUBPROCESS ERRORS
// ============================================================================

/// Failures of a supervised engine run.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to start engine process '{program}': {source}")]
    FailedToStart {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine process exited with code {code}: {stderr}")]
    ExitedWithError { code: i32, stderr: String },

    #[error("Engine process was cancelled")]
    Cancelled,

    #[error("Failed to wait for engine process: {0}")]
    Wait(#[source] std::io::Error),
}

impl BridgeError {
    /// Exit code of the engine when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BridgeError::ExitedWithError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Accumulated stderr text, if the engine ran.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            BridgeError::ExitedWithError { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Failures of [`crate::util::command::spawn_with_error_handling`].
///
/// A nonzero exit is not an error; only the inability to run is.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to start '{program}': {source}")]
    Start {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// An operation did not finish within its allotted time.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Operation timed out after {}ms", .after.as_millis())]
pub struct TimeoutError {
    pub after: Duration,
}

/// Outcome of a single retry attempt that did not succeed.
#[derive(Error, Debug)]
pub enum AttemptError<E> {
    #[error("{0}")]
    Operation(E),

    #[error(transparent)]
    TimedOut(TimeoutError),
}

impl<E> AttemptError<E> {
    /// The original operation error, if the attempt did not time out.
    pub fn into_operation(self) -> Option<E> {
        match self {
            AttemptError::Operation(e) => Some(e),
            AttemptError::TimedOut(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::TimedOut(_))
    }
}

/// Result type for arena-core operations that surface taxonomy errors.
pub type ArenaResult<T> = std::result::Result<T, ArenaError>;

/// Result type for bridge operations.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
