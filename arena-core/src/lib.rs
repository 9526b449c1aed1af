//! Core library for supervising the Arena clip-generation engine.
//!
//! This crate launches the external engine as a subprocess, decodes its
//! line-delimited progress protocol, tracks pipeline stages, and turns
//! failures into a structured error taxonomy with user-facing reports.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use arena_core::bridge::{CancellationToken, ProcessBridge, ProcessOptions, ProgressEvent};
//! use arena_core::config::EngineConfig;
//! use arena_core::progress::{StageTracker, default_stages};
//!
//! let bridge = ProcessBridge::new(EngineConfig::default());
//! let mut tracker = StageTracker::default();
//! tracker.initialize_stages(&default_stages());
//!
//! let options = ProcessOptions::new("talk.mp4", "clips");
//! let run = bridge.run_process(&options, CancellationToken::new()).unwrap();
//! for event in run.events() {
//!     if let ProgressEvent::Progress { stage, progress, message } = event {
//!         tracker.update_stage_progress(&stage, progress, Some(&message));
//!     }
//! }
//! let result = run.wait().unwrap();
//! println!("{result}");
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod reporting;
pub mod util;
pub mod utils;

// Re-exports for public API
pub use bridge::{
    CancellationToken, EngineRun, FormatOptions, ProcessBridge, ProcessOptions, ProgressEvent,
};
pub use config::EngineConfig;
pub use error::{
    ArenaError, ArenaResult, BridgeError, BridgeResult, ErrorKind, PreflightCode, ProcessingCode,
    SystemCode,
};
pub use logging::{LoggingConfig, RotationPolicy};
pub use progress::{Stage, StageRenderer, StageStatus, StageTracker};
pub use reporting::{ErrorReport, classify_bridge_failure, error_title, summarize_errors};
pub use utils::{format_duration, format_elapsed, has_video_extension};
