//! Resilience utilities module
//!
//! Responsibilities:
//! - Spawn subprocesses with streamed, fully accumulated output
//! - Retry fallible operations with deterministic exponential backoff
//! - Bound operations with a timeout
//! - Classify error messages as transient or permanent
//!
//! These helpers are shared by the process bridge and the CLI's pre-flight
//! probes.

pub mod command;
pub mod retry;
pub mod transient;

// Re-export commonly used types and functions
pub use command::{CommandOutput, OutputCallback, SpawnOptions, spawn_with_error_handling};
pub use retry::{RetryOptions, retry_with_backoff, retry_with_backoff_using, with_timeout};
pub use transient::is_transient_error;
