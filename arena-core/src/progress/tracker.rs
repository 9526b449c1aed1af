//! Stage state machine for one engine run.
//!
//! The engine has no explicit "stage started" or "stage finished" messages,
//! so boundaries are inferred: the first progress update for a pending stage
//! starts it, a value of 100 completes it, and starting another stage
//! completes whichever stage was still running.

use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, warn};

use super::stage::{Stage, StageDefinition, StageStatus};

/// Receives tracker state changes.
pub trait StageRenderer {
    /// Called after every state change.
    fn render(&mut self, stages: &[Stage]);

    /// Called as soon as a stage fails, before the next `render`.
    fn stage_failed(&mut self, stage: &Stage);

    /// Called once when the run is over.
    fn finish(&mut self, _stages: &[Stage]) {}
}

/// Renderer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStageRenderer;

impl StageRenderer for NullStageRenderer {
    fn render(&mut self, _stages: &[Stage]) {}
    fn stage_failed(&mut self, _stage: &Stage) {}
}

/// Totals for a finished (or interrupted) run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    /// Stages that never reached a terminal state.
    pub pending: usize,
    pub total_elapsed: Duration,
    /// Elapsed time per stage that has both timestamps, in display order.
    pub stage_times: Vec<(String, Duration)>,
}

/// Owns the stages of a single run and drives a [`StageRenderer`].
pub struct StageTracker {
    stages: Vec<Stage>,
    initialized: bool,
    started_at: Option<DateTime<Local>>,
    renderer: Box<dyn StageRenderer>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new(Box::new(NullStageRenderer))
    }
}

impl StageTracker {
    pub fn new(renderer: Box<dyn StageRenderer>) -> Self {
        Self {
            stages: Vec::new(),
            initialized: false,
            started_at: None,
            renderer,
        }
    }

    /// Replaces all stage state. Display order is the order given.
    pub fn initialize_stages(&mut self, definitions: &[StageDefinition]) {
        self.stages = definitions.iter().map(Stage::from_definition).collect();
        self.initialized = true;
        self.started_at = Some(Local::now());
        debug!("Initialized {} stages", self.stages.len());
        self.renderer.render(&self.stages);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn stages(&self) -> &[Stage] {
        self.assert_initialized();
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.assert_initialized();
        self.stages.iter().find(|stage| stage.matches(id))
    }

    /// The stage currently in progress, if any.
    pub fn current_stage(&self) -> Option<&Stage> {
        self.assert_initialized();
        self.stages
            .iter()
            .find(|stage| stage.status == StageStatus::InProgress)
    }

    /// Starts `id`, completing any other stage still in progress.
    pub fn start_stage(&mut self, id: &str) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        if self.begin(index) {
            self.renderer.render(&self.stages);
        }
    }

    /// Applies a progress update from the engine.
    ///
    /// A pending stage is started first. `progress` is clamped to 0..=100;
    /// while in progress the bar never moves backwards, but the message is
    /// always taken. Reaching 100 completes the stage. Updates to completed
    /// or failed stages are ignored.
    pub fn update_stage_progress(&mut self, id: &str, progress: f64, message: Option<&str>) {
        let Some(index) = self.index_of(id) else {
            return;
        };

        let status = self.stages[index].status;
        if status.is_terminal() {
            debug!("Ignoring progress for {status} stage '{id}'");
            return;
        }
        if status == StageStatus::Pending {
            self.begin(index);
        }

        let value = clamp_progress(progress);
        let stage = &mut self.stages[index];
        if value > stage.progress {
            stage.progress = value;
        }
        if let Some(message) = message {
            stage.message = message.to_string();
        }
        if value >= 100 {
            Self::mark_completed(stage);
        }

        self.renderer.render(&self.stages);
    }

    /// Marks `id` completed. No effect on a terminal stage.
    pub fn complete_stage(&mut self, id: &str) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        let stage = &mut self.stages[index];
        if stage.status.is_terminal() {
            return;
        }
        Self::mark_completed(stage);
        self.renderer.render(&self.stages);
    }

    /// Marks a stage failed: the named one, or else the one in progress.
    ///
    /// The renderer is told immediately through
    /// [`StageRenderer::stage_failed`]. Returns `false` when there is no
    /// stage to fail.
    pub fn fail_stage(&mut self, id: Option<&str>, message: Option<&str>) -> bool {
        self.assert_initialized();
        let index = match id {
            Some(id) => self.index_of(id),
            None => self
                .stages
                .iter()
                .position(|stage| stage.status == StageStatus::InProgress),
        };
        let Some(index) = index else {
            debug!("No stage to mark as failed");
            return false;
        };

        let stage = &mut self.stages[index];
        if stage.status.is_terminal() {
            debug!("Stage '{}' is already {}", stage.id, stage.status);
            return false;
        }

        let now = Local::now();
        stage.status = StageStatus::Failed;
        stage.start_time.get_or_insert(now);
        stage.end_time = Some(now);
        if let Some(message) = message {
            stage.message = message.to_string();
        }
        warn!("Stage '{}' failed: {}", stage.id, stage.message);

        self.renderer.stage_failed(&self.stages[index]);
        self.renderer.render(&self.stages);
        true
    }

    /// Fraction of stages completed, 0.0 to 1.0. Failed stages do not count.
    pub fn overall_progress(&self) -> f64 {
        self.assert_initialized();
        if self.stages.is_empty() {
            return 0.0;
        }
        let completed = self
            .stages
            .iter()
            .filter(|stage| stage.status == StageStatus::Completed)
            .count();
        completed as f64 / self.stages.len() as f64
    }

    pub fn summary(&self) -> RunSummary {
        self.assert_initialized();
        let count = |status: StageStatus| self.stages.iter().filter(|s| s.status == status).count();
        let total_elapsed = self
            .started_at
            .and_then(|start| (Local::now() - start).to_std().ok())
            .unwrap_or_default();

        RunSummary {
            completed: count(StageStatus::Completed),
            failed: count(StageStatus::Failed),
            pending: count(StageStatus::Pending) + count(StageStatus::InProgress),
            total_elapsed,
            stage_times: self
                .stages
                .iter()
                .filter_map(|stage| Some((stage.name.clone(), stage.elapsed()?)))
                .collect(),
        }
    }

    /// Hands the final state to the renderer.
    pub fn finish(&mut self) {
        self.assert_initialized();
        self.renderer.finish(&self.stages);
    }

    fn begin(&mut self, index: usize) -> bool {
        if self.stages[index].status != StageStatus::Pending {
            return false;
        }
        for (i, other) in self.stages.iter_mut().enumerate() {
            if i != index && other.status == StageStatus::InProgress {
                other.progress = 100;
                Self::mark_completed(other);
            }
        }
        let stage = &mut self.stages[index];
        stage.status = StageStatus::InProgress;
        stage.start_time = Some(Local::now());
        debug!("Stage '{}' started", stage.id);
        true
    }

    fn mark_completed(stage: &mut Stage) {
        let now = Local::now();
        stage.status = StageStatus::Completed;
        stage.progress = 100;
        stage.start_time.get_or_insert(now);
        stage.end_time = Some(now);
        debug!("Stage '{}' completed", stage.id);
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.assert_initialized();
        let index = self.stages.iter().position(|stage| stage.matches(id));
        if index.is_none() {
            debug!("Ignoring update for unknown stage '{id}'");
        }
        index
    }

    fn assert_initialized(&self) {
        assert!(
            self.initialized,
            "StageTracker used before initialize_stages was called"
        );
    }
}

fn clamp_progress(progress: f64) -> u8 {
    if progress.is_nan() {
        return 0;
    }
    progress.clamp(0.0, 100.0).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorded {
        renders: usize,
        failures: Vec<String>,
        finished: bool,
    }

    struct RecordingRenderer(Rc<RefCell<Recorded>>);

    impl StageRenderer for RecordingRenderer {
        fn render(&mut self, _stages: &[Stage]) {
            self.0.borrow_mut().renders += 1;
        }

        fn stage_failed(&mut self, stage: &Stage) {
            self.0.borrow_mut().failures.push(stage.id.clone());
        }

        fn finish(&mut self, _stages: &[Stage]) {
            self.0.borrow_mut().finished = true;
        }
    }

    fn tracker() -> StageTracker {
        let mut tracker = StageTracker::default();
        tracker.initialize_stages(&[
            StageDefinition::new("transcription", "Transcription", "🎙️"),
            StageDefinition::new("analysis", "Analysis", "🧠"),
            StageDefinition::new("export", "Export", "📦"),
        ]);
        tracker
    }

    fn status(tracker: &StageTracker, id: &str) -> StageStatus {
        tracker.stage(id).unwrap().status
    }

    #[test]
    fn test_update_auto_starts_pending_stage() {
        let mut tracker = tracker();
        tracker.update_stage_progress("transcription", 10.0, Some("working"));

        let stage = tracker.stage("transcription").unwrap();
        assert_eq!(stage.status, StageStatus::InProgress);
        assert_eq!(stage.progress, 10);
        assert_eq!(stage.message, "working");
        assert!(stage.start_time.is_some());
        assert!(stage.end_time.is_none());
    }

    #[test]
    fn test_progress_100_auto_completes() {
        let mut tracker = tracker();
        tracker.update_stage_progress("analysis", 40.0, None);
        tracker.update_stage_progress("analysis", 100.0, Some("done"));

        let stage = tracker.stage("analysis").unwrap();
        assert_eq!(stage.status, StageStatus::Completed);
        assert_eq!(stage.progress, 100);
        assert!(stage.end_time.unwrap() >= stage.start_time.unwrap());
    }

    #[test]
    fn test_starting_next_stage_completes_previous() {
        let mut tracker = tracker();
        tracker.update_stage_progress("transcription", 30.0, None);
        tracker.start_stage("analysis");

        let previous = tracker.stage("transcription").unwrap();
        assert_eq!(previous.status, StageStatus::Completed);
        assert_eq!(previous.progress, 100);
        assert!(previous.end_time.is_some());
        assert_eq!(status(&tracker, "analysis"), StageStatus::InProgress);

        let in_progress = tracker
            .stages()
            .iter()
            .filter(|s| s.status == StageStatus::InProgress)
            .count();
        assert_eq!(in_progress, 1);
    }

    #[test]
    fn test_first_update_of_next_stage_hands_off() {
        let mut tracker = tracker();
        tracker.update_stage_progress("transcription", 90.0, None);
        tracker.update_stage_progress("analysis", 0.0, Some("starting"));

        assert_eq!(status(&tracker, "transcription"), StageStatus::Completed);
        assert_eq!(status(&tracker, "analysis"), StageStatus::InProgress);
        assert_eq!(tracker.current_stage().unwrap().id, "analysis");
    }

    #[test]
    fn test_progress_is_clamped_and_never_regresses() {
        let mut tracker = tracker();
        tracker.update_stage_progress("transcription", -5.0, None);
        assert_eq!(tracker.stage("transcription").unwrap().progress, 0);

        tracker.update_stage_progress("transcription", 60.0, Some("sixty"));
        tracker.update_stage_progress("transcription", 20.0, Some("sub-step"));
        let stage = tracker.stage("transcription").unwrap();
        assert_eq!(stage.progress, 60);
        assert_eq!(stage.message, "sub-step");

        tracker.update_stage_progress("transcription", 250.0, None);
        assert_eq!(status(&tracker, "transcription"), StageStatus::Completed);
        assert_eq!(tracker.stage("transcription").unwrap().progress, 100);
    }

    #[test]
    fn test_terminal_stages_ignore_updates() {
        let mut tracker = tracker();
        tracker.update_stage_progress("transcription", 100.0, Some("done"));
        tracker.update_stage_progress("transcription", 10.0, Some("again"));

        let stage = tracker.stage("transcription").unwrap();
        assert_eq!(stage.status, StageStatus::Completed);
        assert_eq!(stage.message, "done");

        tracker.start_stage("transcription");
        assert_eq!(status(&tracker, "transcription"), StageStatus::Completed);
    }

    #[test]
    fn test_stage_ids_match_case_insensitively() {
        let mut tracker = tracker();
        tracker.update_stage_progress("Transcription", 50.0, Some("halfway"));
        assert_eq!(tracker.stage("transcription").unwrap().progress, 50);
        assert_eq!(tracker.stage("TRANSCRIPTION").unwrap().message, "halfway");
    }

    #[test]
    fn test_unknown_stage_is_ignored() {
        let mut tracker = tracker();
        tracker.update_stage_progress("rendering", 50.0, None);
        tracker.start_stage("rendering");
        assert!(tracker.current_stage().is_none());
    }

    #[test]
    fn test_fail_current_stage_notifies_immediately() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut tracker = StageTracker::new(Box::new(RecordingRenderer(Rc::clone(&recorded))));
        tracker.initialize_stages(&[
            StageDefinition::new("a", "A", "1"),
            StageDefinition::new("b", "B", "2"),
        ]);
        tracker.update_stage_progress("b", 20.0, None);

        assert!(tracker.fail_stage(None, Some("engine crashed")));
        let failed = tracker.stage("b").unwrap();
        assert_eq!(failed.status, StageStatus::Failed);
        assert_eq!(failed.message, "engine crashed");
        assert!(failed.end_time.is_some());
        assert_eq!(recorded.borrow().failures, vec!["b".to_string()]);

        // Nothing in progress any more.
        assert!(!tracker.fail_stage(None, None));
        // A failed stage stays failed.
        tracker.update_stage_progress("b", 100.0, None);
        assert_eq!(status(&tracker, "b"), StageStatus::Failed);

        tracker.finish();
        assert!(recorded.borrow().finished);
        assert!(recorded.borrow().renders >= 3);
    }

    #[test]
    fn test_fail_named_pending_stage() {
        let mut tracker = tracker();
        assert!(tracker.fail_stage(Some("export"), None));
        let stage = tracker.stage("export").unwrap();
        assert_eq!(stage.status, StageStatus::Failed);
        assert!(stage.start_time.is_some());
        assert!(stage.end_time >= stage.start_time);
    }

    #[test]
    fn test_overall_progress_and_summary() {
        let mut tracker = tracker();
        assert_eq!(tracker.overall_progress(), 0.0);

        tracker.update_stage_progress("transcription", 100.0, None);
        tracker.update_stage_progress("analysis", 50.0, None);
        tracker.fail_stage(None, Some("rate limited"));

        assert!((tracker.overall_progress() - 1.0 / 3.0).abs() < f64::EPSILON);

        let summary = tracker.summary();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pending, 1);
        let names: Vec<_> = summary.stage_times.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Transcription", "Analysis"]);
    }

    #[test]
    fn test_reinitialize_resets_state() {
        let mut tracker = tracker();
        tracker.update_stage_progress("transcription", 100.0, None);
        tracker.initialize_stages(&[StageDefinition::new("formatting", "Formatting", "📐")]);

        assert!(tracker.is_initialized());
        assert_eq!(tracker.stages().len(), 1);
        assert_eq!(status(&tracker, "formatting"), StageStatus::Pending);
        assert!(tracker.stage("transcription").is_none());
    }

    #[test]
    #[should_panic(expected = "before initialize_stages")]
    fn test_update_before_initialize_panics() {
        let mut tracker = StageTracker::default();
        assert!(!tracker.is_initialized());
        tracker.update_stage_progress("transcription", 10.0, None);
    }

    #[test]
    fn test_clamp_progress() {
        assert_eq!(clamp_progress(f64::NAN), 0);
        assert_eq!(clamp_progress(42.4), 42);
        assert_eq!(clamp_progress(99.6), 99);
        assert_eq!(clamp_progress(f64::INFINITY), 100);
    }
}
