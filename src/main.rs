//! hitlab CLI entry point

use clap::Parser;
use hitlab::config::{Cli, Settings};
use hitlab::pipeline::{self, PipelineResult};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level().to_string().to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();

    if let Err(problem) = check_paths(&cli.input, &cli.output) {
        eprintln!("Error: {}", problem);
        return ExitCode::FAILURE;
    }

    let settings = Settings::from_cli(&cli);
    match pipeline::run(&settings) {
        Ok(result) => summarize(&result, &settings),
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Print the closing summary; exit status 1 when any model failed
fn summarize(result: &PipelineResult, settings: &Settings) -> ExitCode {
    let songs = format!("{} songs, {} labelled Hit", result.songs, result.hits);

    if settings.dry_run {
        println!("\nDry run: {}; models not fitted", songs);
        return ExitCode::SUCCESS;
    }

    println!(
        "\n{}; models trained: {}, failed: {}\nResults in {}",
        songs,
        result.models_trained,
        result.models_failed,
        settings.output.display()
    );

    if result.models_failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn check_paths(input: &Path, output: &Path) -> Result<(), String> {
    if !input.is_file() {
        return Err(format!(
            "no chart-week table at {}\n  Usage: hitlab -i billboard_features.csv -o results",
            input.display()
        ));
    }

    let parent = output.parent().filter(|p| !p.as_os_str().is_empty());
    match parent {
        Some(parent) if !parent.exists() => Err(format!(
            "cannot create {}: {} is missing\n  hitlab creates the output directory itself, not its parents",
            output.display(),
            parent.display()
        )),
        _ => Ok(()),
    }
}
