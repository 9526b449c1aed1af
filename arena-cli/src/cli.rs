// arena-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use std::path::PathBuf;

use arena_core::bridge::{CropStrategy, EditorialModel, PadStrategy, Platform, ProcessOptions};
use clap::{Parser, Subcommand};

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Arena: AI video clip generator",
    long_about = "Turns long-form video into short clips by supervising the Arena engine."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Mirror log output to the terminal
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Show cause chains and backtraces for errors, and log at debug level
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Engine install directory (overrides the config file)
    #[arg(long, global = true, value_name = "DIR", env = "ARENA_ENGINE_PATH")]
    pub engine_path: Option<PathBuf>,

    /// Python executable used to run the engine (overrides the config file)
    #[arg(long, global = true, value_name = "PROGRAM", env = "ARENA_PYTHON")]
    pub python: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generates clips from a video file
    Process(ProcessArgs),

    /// Checks that the engine and its dependencies are ready
    Check,

    /// Shows or creates the user configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Prints the effective configuration
    Show,
    /// Writes a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Prints the configuration file location
    Path,
}

#[derive(Parser, Debug, Clone)]
pub struct ProcessArgs {
    /// Video file to process
    #[arg(required = true, value_name = "VIDEO")]
    pub video: PathBuf,

    /// Directory where clips and metadata are written
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of clips to generate (1-50)
    #[arg(short = 'n', long = "count", value_name = "COUNT")]
    pub clip_count: Option<u32>,

    /// Minimum clip duration in seconds
    #[arg(long = "min", value_name = "SECONDS")]
    pub min_duration: Option<u32>,

    /// Maximum clip duration in seconds
    #[arg(long = "max", value_name = "SECONDS")]
    pub max_duration: Option<u32>,

    /// Use the four-layer editorial pipeline
    #[arg(long = "use-4layer")]
    pub use_4layer: bool,

    /// Model for the editorial pipeline (gpt-4o, gpt-4o-mini)
    #[arg(long, value_name = "MODEL")]
    pub editorial_model: Option<EditorialModel>,

    /// Export the intermediate editorial layers
    #[arg(long)]
    pub export_layers: bool,

    /// Use faster, lighter models
    #[arg(long)]
    pub fast: bool,

    /// Ignore cached transcripts and analysis
    #[arg(long)]
    pub no_cache: bool,

    /// Seconds of padding added around each clip
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub padding: Option<f64>,

    /// Snap clip boundaries to scene changes
    #[arg(long)]
    pub scene_detection: bool,

    // --- Platform Formatting ---
    /// Format the generated clips for a platform after processing
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<Platform>,

    /// Crop strategy for the formatting pass
    #[arg(long, value_name = "STRATEGY", requires = "platform")]
    pub crop: Option<CropStrategy>,

    /// Padding strategy for the formatting pass
    #[arg(long, value_name = "STRATEGY", requires = "platform")]
    pub pad: Option<PadStrategy>,
}

impl ProcessArgs {
    /// Engine options for this invocation with the resolved output directory
    /// and clip count.
    pub fn to_options(&self, output_dir: PathBuf, clip_count: Option<u32>) -> ProcessOptions {
        ProcessOptions {
            video_path: self.video.clone(),
            output_dir,
            min_duration: self.min_duration,
            max_duration: self.max_duration,
            clip_count,
            use_4layer: self.use_4layer,
            editorial_model: self.editorial_model,
            export_layers: self.export_layers,
            fast: self.fast,
            no_cache: self.no_cache,
            padding: self.padding,
            scene_detection: self.scene_detection,
        }
    }
}
