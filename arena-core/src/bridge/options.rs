//! Engine invocation options and their command-line serialization.
//!
//! Every optional field maps to exactly one engine argument and is omitted
//! entirely when unset, so the engine applies its own defaults. Boolean
//! switches are emitted only when `true`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Error returned when parsing one of the option enums from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {what} '{value}' (expected one of: {expected})")]
pub struct ParseOptionError {
    what: &'static str,
    value: String,
    expected: String,
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All accepted values, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseOptionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseOptionError {
                        what: $what,
                        value: s.to_string(),
                        expected: [$($text),+].join(", "),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Model used by the engine's editorial pipeline.
    EditorialModel, "editorial model" {
        Gpt4o => "gpt-4o",
        Gpt4oMini => "gpt-4o-mini",
    }
}

string_enum! {
    /// Target platform for the formatting pass.
    Platform, "platform" {
        Tiktok => "tiktok",
        InstagramReels => "instagram-reels",
        YoutubeShorts => "youtube-shorts",
        Youtube => "youtube",
        InstagramFeed => "instagram-feed",
        Twitter => "twitter",
        Linkedin => "linkedin",
    }
}

string_enum! {
    /// How the formatter crops to the platform aspect ratio.
    CropStrategy, "crop strategy" {
        Center => "center",
        Smart => "smart",
        Top => "top",
        Bottom => "bottom",
    }
}

string_enum! {
    /// How the formatter fills letterbox space.
    PadStrategy, "pad strategy" {
        Blur => "blur",
        Black => "black",
        White => "white",
        Color => "color",
    }
}

/// Options for one clip-generation run of the engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessOptions {
    pub video_path: PathBuf,
    pub output_dir: PathBuf,
    /// Minimum clip length in seconds.
    pub min_duration: Option<u32>,
    /// Maximum clip length in seconds.
    pub max_duration: Option<u32>,
    pub clip_count: Option<u32>,
    pub use_4layer: bool,
    pub editorial_model: Option<EditorialModel>,
    pub export_layers: bool,
    pub fast: bool,
    pub no_cache: bool,
    /// Seconds of context added around each clip.
    pub padding: Option<f64>,
    pub scene_detection: bool,
}

impl ProcessOptions {
    pub fn new(video_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            video_path: video_path.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Engine arguments, starting with the `process` subcommand.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "process".to_string(),
            self.video_path.display().to_string(),
            "--output-dir".to_string(),
            self.output_dir.display().to_string(),
        ];

        let mut push = |flag: &str, value: String| {
            args.push(flag.to_string());
            args.push(value);
        };
        if let Some(min) = self.min_duration {
            push("--min-duration", min.to_string());
        }
        if let Some(max) = self.max_duration {
            push("--max-duration", max.to_string());
        }
        if let Some(count) = self.clip_count {
            push("--clip-count", count.to_string());
        }
        if let Some(model) = self.editorial_model {
            push("--editorial-model", model.to_string());
        }
        if let Some(padding) = self.padding {
            push("--padding", padding.to_string());
        }

        let switches = [
            (self.use_4layer, "--use-4layer"),
            (self.export_layers, "--export-layers"),
            (self.fast, "--fast"),
            (self.no_cache, "--no-cache"),
            (self.scene_detection, "--scene-detection"),
        ];
        args.extend(
            switches
                .into_iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, flag)| flag.to_string()),
        );

        args
    }
}

/// Options for the engine's platform-formatting command.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOptions {
    /// A clip file or a directory of clips.
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub platform: Platform,
    pub crop: Option<CropStrategy>,
    pub pad: Option<PadStrategy>,
}

impl FormatOptions {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            platform,
            crop: None,
            pad: None,
        }
    }

    /// Engine arguments, starting with the `format` subcommand.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "format".to_string(),
            self.input.display().to_string(),
            "--output".to_string(),
            self.output_dir.display().to_string(),
            "--platform".to_string(),
            self.platform.to_string(),
        ];
        if let Some(crop) = self.crop {
            args.push("--crop".to_string());
            args.push(crop.to_string());
        }
        if let Some(pad) = self.pad {
            args.push("--pad".to_string());
            args.push(pad.to_string());
        }
        args
    }
}
