//! Plain-text building blocks for stage displays.
//!
//! These produce uncolored text; terminal front-ends add styling on top.

use super::stage::{Stage, StageStatus};
use crate::utils::format_elapsed;

/// Width of the compact bar drawn for a stage in progress.
pub const COMPACT_BAR_WIDTH: usize = 20;

/// Glyph for the stage's current status.
///
/// A running stage shows its own icon.
pub fn status_icon(stage: &Stage) -> &str {
    match stage.status {
        StageStatus::Pending => "○",
        StageStatus::InProgress => &stage.icon,
        StageStatus::Completed => "✓",
        StageStatus::Failed => "✗",
    }
}

/// `width`-character bar filled in proportion to `progress` (0 to 100).
pub fn compact_bar(progress: u8, width: usize) -> String {
    let filled = (usize::from(progress.min(100)) * width) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// One display line for a stage.
pub fn stage_line(stage: &Stage) -> String {
    let icon = status_icon(stage);
    match stage.status {
        StageStatus::Pending => format!("{icon} {}", stage.name),
        StageStatus::InProgress => {
            let mut line = format!(
                "{icon} {} {} {:>3}%",
                stage.name,
                compact_bar(stage.progress, COMPACT_BAR_WIDTH),
                stage.progress
            );
            if !stage.message.is_empty() {
                line.push_str("  ");
                line.push_str(&stage.message);
            }
            line
        }
        StageStatus::Completed => match stage.elapsed() {
            Some(elapsed) => format!("{icon} {} ({})", stage.name, format_elapsed(elapsed)),
            None => format!("{icon} {}", stage.name),
        },
        StageStatus::Failed if stage.message.is_empty() => format!("{icon} {} failed", stage.name),
        StageStatus::Failed => format!("{icon} {} failed: {}", stage.name, stage.message),
    }
}

/// "Overall: 2/6 stages (33%)".
pub fn overall_line(stages: &[Stage]) -> String {
    let total = stages.len();
    let completed = stages
        .iter()
        .filter(|stage| stage.status == StageStatus::Completed)
        .count();
    let percent = if total == 0 { 0 } else { completed * 100 / total };
    format!("Overall: {completed}/{total} stages ({percent}%)")
}
