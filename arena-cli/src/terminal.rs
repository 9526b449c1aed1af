// ============================================================================
// arena-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: UI Components and Styling
//
// This module provides the terminal presentation for the CLI: section and
// status lines, the live stage display driven by the progress tracker, and
// the formatted error block printed before a non-zero exit.
//
// KEY COMPONENTS:
// - styling: Symbols and indentation shared by every printer
// - TerminalStageRenderer: StageRenderer backed by indicatif bars
// - EngineOutput: Passes engine text through without tearing the bars
// - print_error_report: Red-flagged title, message, suggestion, docs link
//
// Color is used only when the stream is a terminal that supports it and
// NO_COLOR is not set.
//
// AI-ASSISTANT-INFO: Terminal UI components, live stage display, error blocks

use std::io::{self, Write};

use arena_core::progress::{Stage, StageRenderer, StageStatus};
use arena_core::progress::render::{overall_line, stage_line};
use arena_core::reporting::ErrorReport;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use owo_colors::OwoColorize;
use supports_color::Stream;
use unicode_width::UnicodeWidthStr;

// ============================================================================
// STYLING CONSTANTS
// ============================================================================

/// Styling constants for terminal output
pub mod styling {
    pub const SUCCESS_SYMBOL: &str = "✓";
    pub const PROCESSING_SYMBOL: &str = "»";
    pub const WARNING_SYMBOL: &str = "!";
    pub const ERROR_SYMBOL: &str = "✗";

    pub const SECTION_PREFIX: &str = "===== ";
    pub const SECTION_SUFFIX: &str = " =====";

    pub const STATUS_INDENT: &str = "  ";
    pub const SUB_ITEM_INDENT: &str = "    ";

    /// Column width for labels in status lines.
    pub const LABEL_WIDTH: usize = 14;
}

static STDOUT_COLOR: Lazy<bool> = Lazy::new(|| color_enabled(Stream::Stdout));
static STDERR_COLOR: Lazy<bool> = Lazy::new(|| color_enabled(Stream::Stderr));

fn color_enabled(stream: Stream) -> bool {
    std::env::var_os("NO_COLOR").is_none() && supports_color::on(stream).is_some()
}

/// Pads `text` to `width` display columns.
pub fn pad_display(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{text}{}", " ".repeat(padding))
}

// ============================================================================
// UI COMPONENTS
// ============================================================================

/// Print a section header for a major phase
pub fn print_section(title: &str) {
    let title = title.to_uppercase();
    println!();
    if *STDOUT_COLOR {
        println!(
            "{}{}{}",
            styling::SECTION_PREFIX,
            title.cyan().bold(),
            styling::SECTION_SUFFIX
        );
    } else {
        println!("{}{title}{}", styling::SECTION_PREFIX, styling::SECTION_SUFFIX);
    }
    println!();
}

/// Print a label/value status line
pub fn print_status(label: &str, value: &str) {
    let label = pad_display(&format!("{label}:"), styling::LABEL_WIDTH);
    if *STDOUT_COLOR {
        println!("{}{} {}", styling::STATUS_INDENT, label, style(value).bold());
    } else {
        println!("{}{label} {value}", styling::STATUS_INDENT);
    }
}

/// Print a processing step
pub fn print_processing(message: &str) {
    if *STDOUT_COLOR {
        println!(
            "{}{} {}",
            styling::STATUS_INDENT,
            styling::PROCESSING_SYMBOL,
            style(message).bold()
        );
    } else {
        println!("{}{} {message}", styling::STATUS_INDENT, styling::PROCESSING_SYMBOL);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    if *STDOUT_COLOR {
        println!(
            "{}{} {}",
            styling::STATUS_INDENT,
            styling::SUCCESS_SYMBOL.green().bold(),
            message.green()
        );
    } else {
        println!("{}{} {message}", styling::STATUS_INDENT, styling::SUCCESS_SYMBOL);
    }
}

/// Print a warning
pub fn print_warning(message: &str) {
    if *STDOUT_COLOR {
        println!(
            "{}{} {}",
            styling::STATUS_INDENT,
            styling::WARNING_SYMBOL.yellow().bold(),
            message.yellow()
        );
    } else {
        println!("{}{} {message}", styling::STATUS_INDENT, styling::WARNING_SYMBOL);
    }
}

/// Print a failed check without ending the run
pub fn print_failure(message: &str) {
    if *STDOUT_COLOR {
        println!(
            "{}{} {}",
            styling::STATUS_INDENT,
            styling::ERROR_SYMBOL.red().bold(),
            message.red()
        );
    } else {
        println!("{}{} {message}", styling::STATUS_INDENT, styling::ERROR_SYMBOL);
    }
}

/// Print a formatted error block to stderr.
///
/// The first line of the report (the title) is flagged in red; the rest is
/// printed as is.
pub fn print_error_report(report: &ErrorReport) {
    let text = report.to_string();
    let mut lines = text.lines();
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    if let Some(title) = lines.next() {
        if *STDERR_COLOR {
            let _ = writeln!(stderr, "{}", title.red().bold());
        } else {
            let _ = writeln!(stderr, "{title}");
        }
    }
    for line in lines {
        if *STDERR_COLOR && line.trim_start().starts_with('→') {
            let _ = writeln!(stderr, "{}", line.cyan());
        } else {
            let _ = writeln!(stderr, "{line}");
        }
    }
}

// ============================================================================
// LIVE STAGE DISPLAY
// ============================================================================

const OVERALL_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:30.cyan/blue}]";

fn stage_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn overall_style() -> ProgressStyle {
    ProgressStyle::with_template(OVERALL_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Writes engine output above the live stage display.
#[derive(Clone)]
pub struct EngineOutput {
    multi: MultiProgress,
}

impl EngineOutput {
    /// Prints one line of engine stdout.
    pub fn line(&self, text: &str) {
        self.multi.suspend(|| {
            println!("{}{text}", styling::SUB_ITEM_INDENT);
        });
    }

    /// Prints a chunk of engine stderr exactly as received.
    pub fn stderr_chunk(&self, chunk: &str) {
        self.multi.suspend(|| {
            let mut stderr = io::stderr().lock();
            if *STDERR_COLOR {
                let _ = write!(stderr, "{}", chunk.dimmed());
            } else {
                let _ = write!(stderr, "{chunk}");
            }
            let _ = stderr.flush();
        });
    }
}

/// Renders tracker state as one indicatif line per stage plus an overall bar.
pub struct TerminalStageRenderer {
    multi: MultiProgress,
    bars: Vec<ProgressBar>,
    overall: Option<ProgressBar>,
}

impl TerminalStageRenderer {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Vec::new(),
            overall: None,
        }
    }

    /// Handle for printing engine output while the display is live.
    pub fn output(&self) -> EngineOutput {
        EngineOutput {
            multi: self.multi.clone(),
        }
    }

    fn ensure_bars(&mut self, count: usize) {
        if self.bars.len() == count && self.overall.is_some() {
            return;
        }
        let _ = self.multi.clear();
        self.bars = (0..count)
            .map(|_| {
                let bar = self.multi.add(ProgressBar::new(100));
                bar.set_style(stage_style());
                bar
            })
            .collect();
        let overall = self.multi.add(ProgressBar::new(count as u64));
        overall.set_style(overall_style());
        self.overall = Some(overall);
    }

    fn styled_line(stage: &Stage) -> String {
        let line = stage_line(stage);
        if !*STDERR_COLOR {
            return line;
        }
        match stage.status {
            StageStatus::Pending => line.dimmed().to_string(),
            StageStatus::InProgress => style(line).bold().to_string(),
            StageStatus::Completed => line.green().to_string(),
            StageStatus::Failed => line.red().to_string(),
        }
    }
}

impl Default for TerminalStageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StageRenderer for TerminalStageRenderer {
    fn render(&mut self, stages: &[Stage]) {
        self.ensure_bars(stages.len());
        for (bar, stage) in self.bars.iter().zip(stages) {
            bar.set_position(u64::from(stage.progress));
            bar.set_message(format!("{}{}", styling::STATUS_INDENT, Self::styled_line(stage)));
        }
        if let Some(overall) = &self.overall {
            let completed = stages
                .iter()
                .filter(|stage| stage.status == StageStatus::Completed)
                .count();
            overall.set_position(completed as u64);
            overall.set_message(overall_line(stages));
            overall.tick();
        }
    }

    fn stage_failed(&mut self, stage: &Stage) {
        let line = format!("{}{}", styling::STATUS_INDENT, stage_line(stage));
        self.multi.suspend(|| {
            if *STDERR_COLOR {
                eprintln!("{}", line.red().bold());
            } else {
                eprintln!("{line}");
            }
        });
    }

    fn finish(&mut self, stages: &[Stage]) {
        for (bar, stage) in self.bars.iter().zip(stages) {
            bar.finish_with_message(format!(
                "{}{}",
                styling::STATUS_INDENT,
                Self::styled_line(stage)
            ));
        }
        if let Some(overall) = &self.overall {
            overall.finish_with_message(overall_line(stages));
        }
    }
}
