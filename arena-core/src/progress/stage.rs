//! Stage model for one pipeline run.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

/// Lifecycle of a stage. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Failed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StageStatus::Pending => "pending",
            StageStatus::InProgress => "in_progress",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Declaration of a stage, supplied when a run is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDefinition {
    pub id: String,
    pub name: String,
    pub icon: String,
}

impl StageDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: icon.into(),
        }
    }
}

/// Live state of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub status: StageStatus,
    /// Percentage, 0 to 100.
    pub progress: u8,
    pub message: String,
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
}

impl Stage {
    pub(crate) fn from_definition(definition: &StageDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            icon: definition.icon.clone(),
            status: StageStatus::Pending,
            progress: 0,
            message: String::new(),
            start_time: None,
            end_time: None,
        }
    }

    /// Time between start and end, once both are known.
    pub fn elapsed(&self) -> Option<Duration> {
        let (start, end) = (self.start_time?, self.end_time?);
        (end - start).to_std().ok()
    }

    /// Case-insensitive id comparison.
    pub fn matches(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }
}

/// The engine's clip-generation pipeline, in execution order.
pub fn default_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::new("loading", "Loading video", "📂"),
        StageDefinition::new("transcription", "Transcription", "🎙️"),
        StageDefinition::new("analysis", "AI analysis", "🧠"),
        StageDefinition::new("scoring", "Scoring", "📊"),
        StageDefinition::new("clipping", "Clip generation", "✂️"),
        StageDefinition::new("export", "Export", "📦"),
    ]
}

/// Single-stage pipeline used for the platform-formatting pass.
pub fn format_stages() -> Vec<StageDefinition> {
    vec![StageDefinition::new("formatting", "Platform formatting", "📐")]
}
