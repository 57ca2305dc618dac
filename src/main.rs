use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postscribe::cli::{Cli, Commands, OutputFormat};
use postscribe::config::Config;
use postscribe::content::{
    ContentRequest, Platform, DEFAULT_HASHTAG_COUNT, MAX_HASHTAG_COUNT, MIN_HASHTAG_COUNT,
};
use postscribe::media::{AudioAsset, MediaAsset};
use postscribe::output;
use postscribe::pipeline::Pipeline;
use postscribe::utils;

struct ProcessArgs {
    file: PathBuf,
    platform: String,
    tone: String,
    caption_length: String,
    hashtag_count: Option<i64>,
    prompt: String,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    save_audio: bool,
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Process {
            file,
            platform,
            tone,
            caption_length,
            hashtag_count,
            prompt,
            output,
            format,
            save_audio,
        } => {
            run_process(ProcessArgs {
                file,
                platform,
                tone,
                caption_length,
                hashtag_count,
                prompt,
                output,
                format,
                save_audio,
                quiet: cli.quiet,
            })
            .await
        }
        Commands::Config { show } => run_config(show).await,
        Commands::Platforms => {
            print_platforms();
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "postscribe=debug"
    } else if quiet {
        "postscribe=warn"
    } else {
        "postscribe=info"
    };

    // stdout is reserved for the rendered report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run_process(args: ProcessArgs) -> anyhow::Result<()> {
    let config = Config::load().await?;

    if !args.quiet {
        for warning in utils::check_dependencies(&config) {
            eprintln!("{} {}", style("⚠").yellow().bold(), warning);
        }
    }

    let asset = MediaAsset::from_path(&args.file, config.max_input_bytes()).await?;
    if !args.quiet {
        eprintln!(
            "{} Processing '{}' ({}, {})",
            style("→").cyan().bold(),
            asset.filename,
            asset.kind.as_str(),
            utils::format_file_size(asset.declared_size),
        );
    }

    let request = ContentRequest {
        platform: args.platform,
        tone: args.tone,
        caption_length: args.caption_length,
        hashtag_count: args.hashtag_count,
    };

    let pipeline = Pipeline::new(config.clone())?;
    let spinner = (!args.quiet).then(make_spinner);
    let started = Instant::now();

    let outcome = pipeline.run(asset, &request, &args.prompt).await;

    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }

    match outcome {
        Ok(report) => {
            if !args.quiet {
                eprintln!(
                    "{} Finished in {}",
                    style("✓").green().bold(),
                    utils::format_duration(started.elapsed())
                );
            }
            if let Some(warning) = &report.warning {
                eprintln!("{} {}", style("⚠").yellow().bold(), warning);
            }

            if args.save_audio || config.app.keep_audio {
                if let Some(audio) = &report.audio {
                    // a failed courtesy save must not cost the caller the report
                    match save_audio_asset(audio).await {
                        Ok(saved) => eprintln!(
                            "{} Extracted audio ({}) saved to {}",
                            style("•").cyan(),
                            utils::format_file_size(audio.bytes.len() as u64),
                            saved.display()
                        ),
                        Err(err) => tracing::warn!("Failed to save extracted audio: {err:#}"),
                    }
                }
            }

            let format = args.format.unwrap_or_else(|| {
                OutputFormat::from_config_str(&config.app.default_output_format)
            });
            let rendered = output::render(&report, &format)?;
            match &args.output {
                Some(path) => {
                    output::save_to_file(&rendered, path).await?;
                    if !args.quiet {
                        eprintln!(
                            "{} Result written to {}",
                            style("✓").green().bold(),
                            path.display()
                        );
                    }
                }
                None => output::print_to_console(&rendered),
            }
            Ok(())
        }
        Err(failure) => {
            // the extracted audio survives a failed transcription so the
            // upload does not have to be extracted again; a failed save is
            // logged and the pipeline failure stays the reported error
            if let Some(audio) = &failure.recovered_audio {
                match save_audio_asset(audio).await {
                    Ok(saved) => eprintln!(
                        "{} Extracted audio kept for retry at {}",
                        style("•").cyan(),
                        saved.display()
                    ),
                    Err(err) => tracing::warn!("Failed to keep extracted audio: {err:#}"),
                }
            }
            Err(failure.into())
        }
    }
}

async fn run_config(show: bool) -> anyhow::Result<()> {
    let config = Config::load().await?;
    if show {
        config.display();
    } else {
        println!("Config file: {}", Config::config_path()?.display());
        println!("Run 'postscribe config --show' to see the active values.");
    }
    Ok(())
}

fn print_platforms() {
    println!("Supported platforms:");
    for platform in Platform::ALL {
        println!("  • {platform}");
    }
    println!();
    println!("Caption lengths: short, medium, long");
    println!(
        "Hashtags: {MIN_HASHTAG_COUNT}-{MAX_HASHTAG_COUNT} per post (default {DEFAULT_HASHTAG_COUNT})"
    );
}

fn make_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    spinner.set_message("Extracting, transcribing and generating...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

async fn save_audio_asset(audio: &AudioAsset) -> anyhow::Result<PathBuf> {
    let stem = Path::new(&audio.filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("audio");
    let extension = Path::new(&audio.filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("mp3");

    let path = PathBuf::from(utils::generate_unique_filename(stem, extension));
    tokio::fs::write(&path, &audio.bytes)
        .await
        .with_context(|| format!("Failed to save extracted audio to {}", path.display()))?;
    Ok(path)
}
