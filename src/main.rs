//! VisionLab - photo capture and on-device vision showcase
//!
//! Command line front end: selects a photo, runs all four capabilities and
//! prints the results.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vision_lab::acquisition::{FileSystemProvider, MediaSource};
use vision_lab::annotate::save_annotated;
use vision_lab::config::{self, AppConfig};
use vision_lab::session::{SessionError, VisionSession};
use vision_lab::storage;
use vision_lab::summary::VisionSummary;
use vision_lab::vision::backends::{native_detectors, FixtureSet};
use vision_lab::vision::{Capability, CapabilityStatus, ProcessingState, VisionSnapshot};

/// VisionLab - text, rectangles, body pose and barcodes from a photo
#[derive(Parser, Debug)]
#[command(name = "vision-lab")]
#[command(about = "Run text, rectangle, body pose and barcode detection on a photo")]
struct Args {
    /// Image file to analyze
    image: Option<PathBuf>,

    /// Use the camera source instead of the photo library
    #[arg(long)]
    camera: bool,

    /// Replay recorded observations instead of the native detectors
    #[arg(long, value_name = "JSON")]
    fixture: Option<PathBuf>,

    /// Write the image with result overlays to this file
    #[arg(long, value_name = "PNG")]
    annotate: Option<PathBuf>,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file to use
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    image: Option<String>,
    snapshot: &'a VisionSnapshot,
    summary: VisionSummary,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => storage::default_config_path()?,
    };
    let stored_config = config::load_or_default(&config_path)?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&stored_config.logging.level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("VisionLab starting...");

    let source = if args.camera {
        MediaSource::Camera
    } else {
        MediaSource::Library
    };
    let runtime_config = apply_args(stored_config.clone(), &args, source);

    let detectors = match &args.fixture {
        Some(path) => FixtureSet::load(path)?.into_detectors(),
        None => native_detectors(&runtime_config.text.language),
    };
    let provider = Arc::new(FileSystemProvider::new(&runtime_config.acquisition));
    let session = VisionSession::new(stored_config, provider, detectors);

    match session.select_image(source).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            println!("No image selected. Pass an image path or configure one.");
            return Ok(ExitCode::SUCCESS);
        }
        Err(SessionError::Acquisition(e)) => {
            if let Some(alert) = session.alert() {
                eprintln!("{}: {}", alert.title, alert.message);
            } else {
                eprintln!("{}", e);
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    }

    let snapshot = session.wait_until_settled().await?;
    let image = session.current_image();

    if let Some(path) = &args.annotate {
        match &image {
            Some(image) => save_annotated(image, &snapshot, path)?,
            None => warn!("No image to annotate"),
        }
    }

    if args.json {
        let report = Report {
            image: image.as_ref().and_then(|i| i.label.clone()),
            snapshot: &snapshot,
            summary: VisionSummary::from_snapshot(&snapshot),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&snapshot, args.fixture.is_some());
    }

    if session.complete_onboarding() {
        config::save_config(&session.config(), &config_path)
            .with_context(|| format!("Failed to save configuration to {:?}", config_path))?;
        info!("Saved configuration to {:?}", config_path);
    }

    info!("VisionLab finished");
    Ok(ExitCode::SUCCESS)
}

/// Point the selected source at the image given on the command line
fn apply_args(mut config: AppConfig, args: &Args, source: MediaSource) -> AppConfig {
    if let Some(path) = &args.image {
        match source {
            MediaSource::Camera => config.acquisition.capture_path = Some(path.clone()),
            MediaSource::Library => config.acquisition.library_path = Some(path.clone()),
        }
    }
    config
}

fn print_report(snapshot: &VisionSnapshot, using_fixture: bool) {
    let summary = VisionSummary::from_snapshot(snapshot);

    println!(
        "Text: {} lines, {} characters, average confidence {:.2}{}",
        summary.text.line_count,
        summary.text.character_count,
        summary.text.average_confidence,
        summary
            .text
            .processing_time
            .map(|d| format!(", {:?}", d))
            .unwrap_or_default()
    );
    for text in &snapshot.texts {
        println!("  [{:.2}] {}", text.confidence, text.text);
    }

    println!(
        "Rectangles: {}, average confidence {:.2}",
        summary.rectangles.count, summary.rectangles.average_confidence
    );
    for rectangle in &snapshot.rectangles {
        let b = rectangle.bounding_box;
        println!(
            "  [{:.2}] x {:.3} y {:.3} w {:.3} h {:.3}",
            rectangle.confidence, b.x, b.y, b.width, b.height
        );
    }

    if summary.pose.body_detected {
        println!(
            "Pose: {} joints, average confidence {:.2}{}",
            summary.pose.joint_count,
            summary.pose.average_confidence,
            summary
                .pose
                .processing_time
                .map(|d| format!(", {:?}", d))
                .unwrap_or_default()
        );
        if let Some(pose) = &snapshot.pose {
            for joint in &pose.joints {
                println!(
                    "  {:<15} ({:.3}, {:.3}) [{:.2}]",
                    joint.name.name(),
                    joint.location.x,
                    joint.location.y,
                    joint.confidence
                );
            }
        }
    } else {
        println!("Pose: no body detected");
    }

    println!("Barcodes: {}", summary.barcodes.count);
    for barcode in &snapshot.barcodes {
        println!("  [{}] {}", barcode.symbology, barcode.payload);
    }

    for capability in Capability::ALL {
        if let CapabilityStatus::Failed(message) = snapshot.statuses.get(capability) {
            println!("{} failed: {}", capability, message);
        }
    }

    if let Some(hint) = pose_hint(snapshot, using_fixture) {
        println!("Note: {}", hint);
    }

    match &snapshot.state {
        ProcessingState::Completed => println!("Status: completed"),
        ProcessingState::Error(_) => println!("Status: completed with errors"),
        other => println!("Status: {:?}", other),
    }
}

/// Native detectors have no pose backend, so a pose failure is expected
fn pose_hint(snapshot: &VisionSnapshot, using_fixture: bool) -> Option<&'static str> {
    match snapshot.statuses.get(Capability::Pose) {
        CapabilityStatus::Failed(_) if !using_fixture => Some(
            "body pose has no native backend; replay recorded observations with --fixture to see pose results",
        ),
        _ => None,
    }
}
