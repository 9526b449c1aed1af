// ============================================================================
// arena-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Result alias and the top-level error handler
//
// Commands return anyhow errors; taxonomy errors from arena-core travel
// inside them and are found again when the error is reported. Everything
// that reaches main is formatted here and turned into exit code 1.
//
// AI-ASSISTANT-INFO: CLI result type and top-level error formatting

use arena_core::reporting::ErrorReport;
use log::error;

use crate::terminal;

/// Exit code for any caught error.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Result type for CLI commands.
pub type CliResult<T> = anyhow::Result<T>;

/// Logs and prints `err` as a formatted report.
///
/// With `debug`, the cause chain and backtrace are appended below the
/// message.
pub fn report_error(err: &anyhow::Error, debug: bool) -> ErrorReport {
    let report = ErrorReport::from_error(err, debug).with_help();
    match report.code {
        Some(code) => error!("{} [{code}]: {:#}", report.title, err),
        None => error!("{}: {:#}", report.title, err),
    }
    terminal::print_error_report(&report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::error::{ArenaError, PreflightCode};

    #[test]
    fn test_report_carries_help_for_known_codes() {
        let err = anyhow::Error::new(ArenaError::preflight(
            PreflightCode::MissingApiKey,
            "OPENAI_API_KEY is not set",
        ));
        let report = report_error(&err, false);
        assert_eq!(report.code, Some("MISSING_API_KEY"));
        assert!(report.help.is_some());
        assert!(report.details.is_empty());
    }

    #[test]
    fn test_foreign_errors_are_unexpected() {
        let err = anyhow::anyhow!("socket closed").context("while talking to the engine");
        let report = report_error(&err, true);
        assert_eq!(report.title, "Unexpected Error");
        assert_eq!(report.code, None);
        assert!(report.details.iter().any(|line| line.contains("socket closed")));
    }
}
