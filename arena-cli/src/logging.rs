// ============================================================================
// arena-cli/src/logging.rs
// ============================================================================
//
// LOGGING UTILITIES: Logger startup for the CLI
//
// The logger is configured once in main from the user config and the global
// flags, using arena-core's log4rs setup. Records go to a size-rotated file
// under ~/.arena/logs and, with --verbose or --debug, to stderr as well.
//
// AI-ASSISTANT-INFO: Logger initialization and run headers

use arena_core::logging::LoggingConfig;
use log::info;

use crate::terminal;

/// Returns the current local timestamp formatted as "YYYY-MM-DD HH:MM:SS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Installs the global logger.
///
/// A logger that cannot be set up (for example an unwritable log
/// directory) is reported as a warning and the run continues without it.
pub fn init_logging(config: &LoggingConfig) {
    match config.init() {
        Ok(()) => {
            info!("Arena CLI v{} started at {}", env!("CARGO_PKG_VERSION"), get_timestamp());
            if let Some(path) = &config.log_file {
                info!("Logging to {}", path.display());
            }
        }
        Err(e) => terminal::print_warning(&format!("Logging disabled: {e:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_shape() {
        let stamp = get_timestamp();
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], " ");
    }
}
