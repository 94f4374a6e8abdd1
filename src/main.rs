use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use platesight::config::{self, AppConfig};
use platesight::core::db::{
    ActivityFilter, ActivityLog, ActivityRepository, NewActivity, StatusFilter,
};
use platesight::core::export;
use platesight::detection::decode_image_bytes;
use platesight::legality::{self, LegalityChecker};
use platesight::{
    CameraSampler, DirectoryFrameSource, OcrsRecognizer, RecognitionPipeline, RecognitionResult,
};

#[derive(Parser)]
#[command(name = "platesight")]
#[command(about = "Detect and read license plates from images")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recognize plates in a single image file
    Recognize {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Region code recorded with the reading
        #[arg(long)]
        region: Option<String>,

        /// Check the best reading against the allow-list and log it
        #[arg(long)]
        log: bool,
    },
    /// Sample frames from a directory at the camera cadence
    Watch {
        /// Directory of frames, processed in file name order
        #[arg(value_name = "DIR")]
        frames_dir: PathBuf,

        /// Milliseconds between samples
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Region code recorded with each reading
        #[arg(long)]
        region: Option<String>,
    },
    /// Check a manually entered plate and log it
    Check {
        plate: String,

        #[arg(long)]
        region: Option<String>,
    },
    /// Inspect or maintain the activity log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// List logged checks, newest first
    List {
        /// Match plate numbers or regions containing this text
        #[arg(long)]
        search: Option<String>,

        /// all, legal or illegal
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },
    /// Export the log as CSV
    Export {
        /// Output file (defaults to plate-detection-log-<date>.csv)
        #[arg(value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Delete every logged check
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = config::load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Recognize { image_path, region, log } => {
            recognize(&config, &image_path, region, log).await
        }
        Command::Watch { frames_dir, interval_ms, region } => {
            watch(&config, &frames_dir, interval_ms, region).await
        }
        Command::Check { plate, region } => {
            let checker = LegalityChecker::from_settings(&config.legality);
            let Some(verdict) = checker.check(&plate) else {
                anyhow::bail!("Plate number is empty");
            };
            println!("{}: {}", verdict.plate, verdict.message);
            let log = ActivityLog::open(&config.storage.database_path).await?;
            log.append(NewActivity {
                plate_number: verdict.plate,
                region: region_or_default(&config, region),
                is_legal: verdict.is_legal,
                confidence: 100.0,
            })
            .await?;
            log.close().await;
            Ok(())
        }
        Command::Log { action } => run_log_action(&config, action).await,
    }
}

fn build_pipeline(config: &AppConfig) -> RecognitionPipeline<OcrsRecognizer> {
    let recognizer = Arc::new(OcrsRecognizer::new(config.ocr.clone()));
    RecognitionPipeline::new(recognizer).with_geometry(config.geometry)
}

fn region_or_default(config: &AppConfig, region: Option<String>) -> String {
    let region = region.unwrap_or_else(|| config.legality.default_region.clone());
    if legality::region_label(&region).is_none() {
        warn!(region = %region, "Unknown region code");
    }
    region
}

fn print_result(index: usize, result: &RecognitionResult) {
    match result.coordinates() {
        Some(rect) => println!(
            "  {}. {} at ({}, {}) {}x{} - confidence: {:.1}%",
            index + 1,
            result.text(),
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            result.confidence()
        ),
        None => println!(
            "  {}. {} - confidence: {:.1}%",
            index + 1,
            result.text(),
            result.confidence()
        ),
    }
}

async fn log_sighting(
    log: &ActivityLog,
    checker: &LegalityChecker,
    region: &str,
    result: &RecognitionResult,
) -> anyhow::Result<()> {
    if let Some(verdict) = checker.check(result.text()) {
        println!("  {}: {}", verdict.plate, verdict.message);
        log.append(NewActivity {
            plate_number: verdict.plate,
            region: region.to_string(),
            is_legal: verdict.is_legal,
            confidence: result.confidence(),
        })
        .await?;
    }
    Ok(())
}

async fn recognize(
    config: &AppConfig,
    image_path: &Path,
    region: Option<String>,
    log: bool,
) -> anyhow::Result<()> {
    info!("Loading image: {:?}", image_path);
    let bytes = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("Failed to read {:?}", image_path))?;
    let img = decode_image_bytes(&bytes)?;
    info!("Image loaded: {}x{}", img.width(), img.height());

    let pipeline = build_pipeline(config);
    let results = pipeline.recognize(img).await?;
    pipeline.terminate().await;

    println!("\n=== License Plate Recognition Results ===");
    println!("Total detections: {}", results.len());
    if results.is_empty() {
        println!("No license plates detected.");
        return Ok(());
    }
    for (i, result) in results.iter().enumerate() {
        print_result(i, result);
    }

    if log {
        let activity_log = ActivityLog::open(&config.storage.database_path).await?;
        let checker = LegalityChecker::from_settings(&config.legality);
        let region = region_or_default(config, region);
        log_sighting(&activity_log, &checker, &region, &results[0]).await?;
        activity_log.close().await;
    }
    Ok(())
}

async fn watch(
    config: &AppConfig,
    frames_dir: &Path,
    interval_ms: Option<u64>,
    region: Option<String>,
) -> anyhow::Result<()> {
    let mut camera = config.camera.clone();
    if let Some(interval_ms) = interval_ms {
        camera.interval_ms = interval_ms;
    }

    let source = DirectoryFrameSource::open(frames_dir)?;
    let pipeline = Arc::new(build_pipeline(config));
    pipeline.initialize().await?;

    let activity_log = ActivityLog::open(&config.storage.database_path).await?;
    let checker = LegalityChecker::from_settings(&config.legality);
    let region = region_or_default(config, region);

    let (handle, mut results) = CameraSampler::new(pipeline.clone(), source)
        .with_settings(&camera)
        .spawn();

    let mut sightings = 0;
    while let Some(best) = results.recv().await {
        print_result(sightings, &best);
        log_sighting(&activity_log, &checker, &region, &best).await?;
        sightings += 1;
    }

    let stats = handle.stats();
    handle.join().await;
    pipeline.terminate().await;
    activity_log.close().await;

    info!(
        ticks = stats.ticks,
        skipped = stats.skipped,
        processed = stats.processed,
        failed = stats.failed,
        sightings,
        "Watch finished"
    );
    Ok(())
}

async fn run_log_action(config: &AppConfig, action: LogAction) -> anyhow::Result<()> {
    let log = ActivityLog::open(&config.storage.database_path).await?;

    match action {
        LogAction::List { search, status } => {
            let entries = log.load_all().await?;
            let filter = ActivityFilter { search, status };
            let matching = filter.apply(&entries);
            if matching.is_empty() {
                println!("No activity records found.");
            }
            for entry in matching {
                println!(
                    "{}  {:<10} {:<7} {:<8} {:.1}%",
                    entry.timestamp,
                    entry.plate_number,
                    entry.region,
                    if entry.is_legal { "Legal" } else { "Illegal" },
                    entry.confidence
                );
            }
        }
        LogAction::Export { output } => {
            let entries = log.load_all().await?;
            let output = output.unwrap_or_else(|| {
                PathBuf::from(export::export_file_name(OffsetDateTime::now_utc().date()))
            });
            export::export_to_path(&entries, &output)?;
            println!("Exported {} records to {}", entries.len(), output.display());
        }
        LogAction::Clear => {
            log.clear().await?;
            println!("Activity log cleared.");
        }
    }

    log.close().await;
    Ok(())
}
