//! Implementation of the 'process' subcommand.
//!
//! Validates the request, runs the engine while streaming its stages to the
//! terminal, and reports the clips it produced. An optional second engine
//! run formats those clips for a target platform.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use arena_core::bridge::{
    CancellationToken, EngineRun, FormatOptions, Platform, ProcessBridge, ProgressEvent,
};
use arena_core::error::{ArenaError, BridgeError, ProcessingCode};
use arena_core::progress::{StageTracker, default_stages, format_stages};
use arena_core::reporting::classify_bridge_failure;
use arena_core::utils::{format_duration, format_elapsed};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::cli::ProcessArgs;
use crate::config::UserConfig;
use crate::error::CliResult;
use crate::preflight::{self, API_KEY_VAR};
use crate::terminal::{self, EngineOutput, TerminalStageRenderer};

/// Stage id used for the formatting pass.
const FORMAT_STAGE: &str = "formatting";

/// Subdirectory of the output directory holding generated clips.
const CLIPS_DIR: &str = "clips";

/// Subdirectory of the output directory holding formatted clips.
const FORMATTED_DIR: &str = "formatted";

/// One clip from the engine's result payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClipSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
    #[serde(default, alias = "final_score", alias = "interest_score")]
    pub score: Option<f64>,
}

impl ClipSummary {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// The parts of the engine result the CLI reports on.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProcessOutcome {
    #[serde(default)]
    pub clips: Vec<ClipSummary>,
    #[serde(default)]
    pub metadata_path: Option<PathBuf>,
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
}

impl ProcessOutcome {
    /// Reads the result payload. Unknown keys are ignored and a payload of
    /// another shape counts as having no clips.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            debug!("Engine result has an unexpected shape: {e}");
            Self::default()
        })
    }
}

/// Runs the `process` command.
pub fn run_process(
    args: &ProcessArgs,
    config: &UserConfig,
    bridge: &ProcessBridge,
) -> CliResult<()> {
    let started = Instant::now();
    let output_dir = config.output_dir(args.output_dir.as_deref());
    let mut options = args.to_options(output_dir, config.clip_count(args.clip_count));

    let api_key = std::env::var(API_KEY_VAR).ok();
    preflight::run_preflight(&options, bridge, api_key.as_deref())?;

    // The engine runs inside its own directory, so it gets absolute paths.
    options.video_path = absolute(&options.video_path)?;
    options.output_dir = absolute(&options.output_dir)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            warn!("Interrupt received, stopping the engine");
            cancel.cancel();
        })
        .context("Failed to install the Ctrl+C handler")?;
    }

    terminal::print_section("Processing");
    terminal::print_status("Input", &options.video_path.display().to_string());
    terminal::print_status("Output", &options.output_dir.display().to_string());
    if let Some(count) = options.clip_count {
        terminal::print_status("Clips", &count.to_string());
    }
    println!();

    let renderer = TerminalStageRenderer::new();
    let output = renderer.output();
    let mut tracker = StageTracker::new(Box::new(renderer));
    tracker.initialize_stages(&default_stages());

    let run = bridge
        .run_process(&options, cancel.clone())
        .map_err(|e| classify_bridge_failure(&e))?;
    let result = drive(run, &mut tracker, &output);
    let value = settle(result, &mut tracker, classify_bridge_failure)?;

    let outcome = ProcessOutcome::from_value(&value);
    if outcome.clips.is_empty() {
        return Err(ArenaError::processing(
            ProcessingCode::NoClipsGenerated,
            "The engine finished but did not produce any clips",
        )
        .with_suggestion("Try a longer video, a lower --min, or a higher --count")
        .into());
    }
    info!("Engine produced {} clips", outcome.clips.len());
    print_summary(&outcome, &tracker);

    if let Some(platform) = args.platform {
        let mut format = FormatOptions::new(
            options.output_dir.join(CLIPS_DIR),
            options.output_dir.join(FORMATTED_DIR).join(platform.as_str()),
            platform,
        );
        format.crop = args.crop;
        format.pad = args.pad;
        run_format_pass(bridge, &format, cancel)?;
    }

    println!();
    terminal::print_success(&format!(
        "Done in {}",
        format_elapsed(started.elapsed())
    ));
    Ok(())
}

/// Feeds engine events to the tracker and the terminal until stdout closes,
/// then settles the run.
fn drive(
    run: EngineRun,
    tracker: &mut StageTracker,
    output: &EngineOutput,
) -> Result<Value, BridgeError> {
    for event in run.events() {
        match event {
            ProgressEvent::Progress {
                stage,
                progress,
                message,
            } => tracker.update_stage_progress(&stage, progress, Some(&message)),
            ProgressEvent::RawLine(line) => output.line(&line),
            ProgressEvent::Error(chunk) => output.stderr_chunk(&chunk),
            ProgressEvent::Result(_) => debug!("Engine reported its result"),
        }
    }
    run.wait()
}

/// Closes out the tracker for a settled run and maps failures onto the
/// error taxonomy with `classify`.
fn settle(
    result: Result<Value, BridgeError>,
    tracker: &mut StageTracker,
    classify: impl FnOnce(&BridgeError) -> ArenaError,
) -> CliResult<Value> {
    match result {
        Ok(value) => {
            tracker.finish();
            Ok(value)
        }
        Err(e) => {
            let error = classify(&e);
            tracker.fail_stage(None, Some(error.message()));
            tracker.finish();
            Err(anyhow::Error::new(error).context(e.to_string()))
        }
    }
}

/// Formats the generated clips for `format.platform` as a second engine run.
fn run_format_pass(
    bridge: &ProcessBridge,
    format: &FormatOptions,
    cancel: CancellationToken,
) -> CliResult<()> {
    terminal::print_section(&format!("Formatting for {}", format.platform));

    let renderer = TerminalStageRenderer::new();
    let output = renderer.output();
    let mut tracker = StageTracker::new(Box::new(renderer));
    tracker.initialize_stages(&format_stages());
    tracker.start_stage(FORMAT_STAGE);

    let run = bridge
        .run_format(format, cancel)
        .map_err(|e| classify_format_failure(&e, format.platform))?;
    let result = drive(run, &mut tracker, &output);
    if result.is_ok() {
        tracker.complete_stage(FORMAT_STAGE);
    }
    settle(result, &mut tracker, |e| classify_format_failure(e, format.platform))?;

    terminal::print_success(&format!(
        "Formatted clips written to {}",
        format.output_dir.display()
    ));
    Ok(())
}

/// Formatting failures are FORMAT_FAILED unless the engine never started or
/// the run was cancelled.
fn classify_format_failure(error: &BridgeError, platform: Platform) -> ArenaError {
    match error {
        BridgeError::ExitedWithError { .. } => ArenaError::processing(
            ProcessingCode::FormatFailed,
            format!("Formatting for {platform} failed: {error}"),
        )
        .with_suggestion("Try another --crop or --pad strategy"),
        _ => classify_bridge_failure(error),
    }
}

fn print_summary(outcome: &ProcessOutcome, tracker: &StageTracker) {
    terminal::print_section("Clips");
    for (i, clip) in outcome.clips.iter().enumerate() {
        let name = clip.title.as_deref().unwrap_or(&clip.id);
        let mut line = format!(
            "{:>2}. {name}  {} - {} ({:.0}s)",
            i + 1,
            format_duration(clip.start_time),
            format_duration(clip.end_time),
            clip.duration()
        );
        if let Some(score) = clip.score {
            line.push_str(&format!("  score {score:.1}"));
        }
        terminal::print_processing(&line);
    }

    println!();
    if let Some(path) = &outcome.metadata_path {
        terminal::print_status("Metadata", &path.display().to_string());
    }
    if let Some(path) = &outcome.transcript_path {
        terminal::print_status("Transcript", &path.display().to_string());
    }

    let summary = tracker.summary();
    for (name, elapsed) in &summary.stage_times {
        terminal::print_status(name, &format_elapsed(*elapsed));
    }
}

fn absolute(path: &Path) -> CliResult<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_from_engine_result() {
        let value = json!({
            "clips": [
                {"id": "clip_001", "start_time": 12.5, "end_time": 48.0, "final_score": 8.25, "text": "..."},
                {"id": "clip_002", "title": "The reveal", "start_time": 90.0, "end_time": 120.0}
            ],
            "metadata_path": "/out/metadata.json",
            "transcript_path": "/out/transcript.json",
            "success": true
        });

        let outcome = ProcessOutcome::from_value(&value);
        assert_eq!(outcome.clips.len(), 2);
        assert_eq!(outcome.clips[0].score, Some(8.25));
        assert_eq!(outcome.clips[0].duration(), 35.5);
        assert_eq!(outcome.clips[1].title.as_deref(), Some("The reveal"));
        assert_eq!(outcome.metadata_path, Some(PathBuf::from("/out/metadata.json")));
    }

    #[test]
    fn test_bare_success_has_no_clips() {
        let outcome = ProcessOutcome::from_value(&json!({"success": true}));
        assert!(outcome.clips.is_empty());

        let odd = ProcessOutcome::from_value(&json!({"clips": "not a list"}));
        assert!(odd.clips.is_empty());
    }

    #[test]
    fn test_format_failures_are_classified() {
        let exit = BridgeError::ExitedWithError {
            code: 1,
            stderr: "ERROR: ffmpeg failed".to_string(),
        };
        let err = classify_format_failure(&exit, Platform::Tiktok);
        assert_eq!(err.code(), "FORMAT_FAILED");
        assert!(err.message().contains("tiktok"));

        let cancelled = classify_format_failure(&BridgeError::Cancelled, Platform::Youtube);
        assert_eq!(cancelled.code(), "CANCELLED");
    }

    #[test]
    fn test_settle_marks_running_stage_failed() {
        let mut tracker = StageTracker::default();
        tracker.initialize_stages(&default_stages());
        tracker.update_stage_progress("analysis", 30.0, Some("Thinking"));

        let failure = BridgeError::ExitedWithError {
            code: 1,
            stderr: "ERROR: AI analysis failed: timeout".to_string(),
        };
        let err = settle(Err(failure), &mut tracker, classify_bridge_failure).unwrap_err();

        let arena = arena_core::error::classify(&err).unwrap();
        assert!(arena.is_processing());
        let stage = tracker.stage("analysis").unwrap();
        assert_eq!(stage.status, arena_core::progress::StageStatus::Failed);
        assert_eq!(stage.message, arena.message());
    }
}
