// arena-cli/src/main.rs
//
// Entry point for the Arena command-line tool.
//
// Responsibilities include:
// - Parsing the command line into `Cli`.
// - Loading the user config file and starting the logger.
// - Building the engine configuration from flags, environment, and config.
// - Dispatching to the selected command.
// - Formatting any error that escapes a command and exiting with code 1.

use std::env;
use std::process;

use arena_cli::error::FAILURE_EXIT_CODE;
use arena_cli::{Cli, Commands, UserConfig, logging, report_error, run_check, run_config, run_process};
use arena_core::bridge::ProcessBridge;
use clap::Parser;
use log::info;

fn main() {
    let cli = Cli::parse();

    // anyhow decides at construction time whether an error carries a
    // backtrace, so this has to happen before any error exists.
    if cli.debug && env::var_os("RUST_LIB_BACKTRACE").is_none() {
        // SAFETY: no other threads have been started yet.
        unsafe { env::set_var("RUST_LIB_BACKTRACE", "1") };
    }

    // A broken config file only matters to commands that read it.
    let loaded = UserConfig::load();
    let config = loaded.clone().unwrap_or_default();
    logging::init_logging(&config.logging_config(cli.verbose, cli.debug));

    let engine = config.engine_config(cli.engine_path.as_deref(), cli.python.as_deref());
    info!(
        "Engine directory: {}, python: {}",
        engine.engine_dir.display(),
        engine.python
    );

    let result = match &cli.command {
        Commands::Process(args) => loaded
            .map_err(anyhow::Error::new)
            .and_then(|config| run_process(args, &config, &ProcessBridge::new(engine))),
        Commands::Check => loaded
            .map_err(anyhow::Error::new)
            .and_then(|_| run_check(&ProcessBridge::new(engine))),
        Commands::Config(command) => run_config(command, loaded, &engine),
    };

    if let Err(e) = result {
        report_error(&e, cli.debug);
        process::exit(FAILURE_EXIT_CODE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_cli::ConfigCommand;
    use arena_core::bridge::{EditorialModel, Platform};
    use std::path::PathBuf;

    #[test]
    fn test_parse_process_basic_args() {
        let cli = Cli::parse_from(["arena", "process", "talk.mp4"]);

        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.video, PathBuf::from("talk.mp4"));
                assert!(args.output_dir.is_none());
                assert!(args.clip_count.is_none());
                assert!(!args.fast);
                assert!(args.platform.is_none());
            }
            other => panic!("Expected Process command, got {other:?}"),
        }
        assert!(!cli.verbose);
        assert!(!cli.debug);
    }

    #[test]
    fn test_parse_process_with_all_flags() {
        let cli = Cli::parse_from([
            "arena",
            "--debug",
            "process",
            "talk.mp4",
            "-o",
            "clips",
            "-n",
            "5",
            "--min",
            "20",
            "--max",
            "60",
            "--use-4layer",
            "--editorial-model",
            "gpt-4o-mini",
            "--export-layers",
            "--fast",
            "--no-cache",
            "--padding",
            "1.5",
            "--scene-detection",
            "--platform",
            "youtube-shorts",
            "--crop",
            "smart",
        ]);

        assert!(cli.debug);
        let Commands::Process(args) = cli.command else {
            panic!("Expected Process command");
        };
        assert_eq!(args.output_dir, Some(PathBuf::from("clips")));
        assert_eq!(args.clip_count, Some(5));
        assert_eq!(args.min_duration, Some(20));
        assert_eq!(args.max_duration, Some(60));
        assert!(args.use_4layer && args.export_layers && args.fast);
        assert!(args.no_cache && args.scene_detection);
        assert_eq!(args.editorial_model, Some(EditorialModel::Gpt4oMini));
        assert_eq!(args.padding, Some(1.5));
        assert_eq!(args.platform, Some(Platform::YoutubeShorts));

        let options = args.to_options(PathBuf::from("clips"), Some(5));
        assert_eq!(
            options.to_args(),
            vec![
                "process",
                "talk.mp4",
                "--output-dir",
                "clips",
                "--min-duration",
                "20",
                "--max-duration",
                "60",
                "--clip-count",
                "5",
                "--editorial-model",
                "gpt-4o-mini",
                "--padding",
                "1.5",
                "--use-4layer",
                "--export-layers",
                "--fast",
                "--no-cache",
                "--scene-detection",
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_editorial_model() {
        let result = Cli::try_parse_from([
            "arena",
            "process",
            "talk.mp4",
            "--editorial-model",
            "gpt-2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_crop_requires_platform() {
        let result = Cli::try_parse_from(["arena", "process", "talk.mp4", "--crop", "center"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_subcommands() {
        let cli = Cli::parse_from(["arena", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommand::Init { force: true })
        ));

        let cli = Cli::parse_from(["arena", "-v", "check"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Check));
    }
}
