use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use facegate_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use facegate_core::detection::infrastructure::replay_face_detector::ReplayFaceDetector;
use facegate_core::dispatch::infrastructure::threaded_detection_worker::ThreadedDetectionWorker;
use facegate_core::enrollment::domain::session::{Session, SessionEvent};
use facegate_core::enrollment::infrastructure::reference_file::{
    load_reference, ImportReport, ReferenceArtifact,
};
use facegate_core::pipeline::frame_pipeline::{FramePipeline, PipelineConfig, PipelineOutcome};
use facegate_core::pipeline::status_reporter::LogStatusReporter;
use facegate_core::shared::settings::Settings;

/// Exit code when verification ran to the end of the feed without a match.
const EXIT_NO_MATCH: i32 = 2;

/// Face enrollment and verification over a sequence of frames.
#[derive(Parser)]
#[command(name = "facegate")]
struct Cli {
    /// Settings file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum milliseconds between detection requests.
    #[arg(long, global = true)]
    tick_ms: Option<u64>,

    /// Longest side of the frames sent to the detector.
    #[arg(long, global = true)]
    max_side: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture reference descriptors and export them.
    Enroll {
        /// Directory of frames, read in file-name order.
        #[arg(long)]
        frames: PathBuf,

        /// JSON file of per-frame face records.
        #[arg(long)]
        detections: PathBuf,

        /// Samples to capture before finalizing.
        #[arg(long)]
        quota: Option<usize>,

        /// Where to write the reference file.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Match live faces against a reference file.
    Verify {
        #[arg(long)]
        frames: PathBuf,

        #[arg(long)]
        detections: PathBuf,

        /// Reference file produced by `enroll`.
        #[arg(long)]
        reference: PathBuf,

        /// Match when the distance is strictly below this value.
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Show what a reference file contains.
    Inspect {
        #[arg(long)]
        reference: PathBuf,
    },
}

fn main() {
    env_logger::init();

    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli)?;

    match cli.command {
        Command::Enroll {
            frames,
            detections,
            quota,
            out_dir,
        } => {
            if let Some(quota) = quota {
                settings.enrollment_quota = quota;
            }
            settings.validate()?;
            run_enroll(&frames, &detections, &out_dir, &settings)
        }
        Command::Verify {
            frames,
            detections,
            reference,
            threshold,
        } => {
            if let Some(threshold) = threshold {
                settings.match_threshold = threshold;
            }
            settings.validate()?;
            run_verify(&frames, &detections, &reference, &settings)
        }
        Command::Inspect { reference } => run_inspect(&reference),
    }
}

fn run_enroll(
    frames: &Path,
    detections: &Path,
    out_dir: &Path,
    settings: &Settings,
) -> Result<i32, Box<dyn std::error::Error>> {
    let mut session = Session::new(settings.enrollment_quota, settings.match_threshold);
    session.begin_enrollment();

    let outcome = run_pipeline(frames, detections, session, settings)?;
    match outcome.terminal_event {
        Some(SessionEvent::EnrollmentFinalized(set)) => {
            let artifact = ReferenceArtifact::from_set(&set, &settings.reference_file_name)?;
            let path = artifact.save_in(out_dir)?;
            println!("Enrolled {} samples into {}", set.len(), path.display());
            Ok(0)
        }
        _ => Err(format!(
            "Enrollment incomplete: feed ended after {} frames without {} usable samples",
            outcome.stats.completed, settings.enrollment_quota
        )
        .into()),
    }
}

fn run_verify(
    frames: &Path,
    detections: &Path,
    reference: &Path,
    settings: &Settings,
) -> Result<i32, Box<dyn std::error::Error>> {
    let report = load_reference(reference)?;
    log_dropped(&report);

    let mut session = Session::new(settings.enrollment_quota, settings.match_threshold);
    session.load_reference(report.reference);
    session.begin_verification();

    let outcome = run_pipeline(frames, detections, session, settings)?;
    if let Some(SessionEvent::Accepted(report)) = outcome.terminal_event {
        println!(
            "Verified: distance {:.4} to reference #{}",
            report.distance, report.reference_index
        );
        return Ok(0);
    }

    match outcome.last_event {
        Some(SessionEvent::Rejected {
            best_distance: Some(d),
        }) => println!(
            "No match: closest distance {d:.4} (threshold {})",
            settings.match_threshold
        ),
        _ => println!("No match after {} frames", outcome.stats.completed),
    }
    Ok(EXIT_NO_MATCH)
}

fn run_inspect(reference: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let report = load_reference(reference)?;
    let kept = &report.reference;

    println!("{}", reference.display());
    println!("  descriptors: {}", kept.len());
    if let Some(len) = kept.descriptor_len() {
        let odd = kept.descriptors().iter().filter(|d| d.len() != len).count();
        if odd == 0 {
            println!("  length:      {len}");
        } else {
            println!("  length:      {len} ({odd} entries differ)");
        }
    }
    println!("  dropped:     {}", report.dropped.len());
    for entry in &report.dropped {
        println!("    [{}] {}", entry.key, entry.reason);
    }
    Ok(0)
}

fn run_pipeline(
    frames: &Path,
    detections: &Path,
    session: Session,
    settings: &Settings,
) -> Result<PipelineOutcome, Box<dyn std::error::Error>> {
    if !detections.exists() {
        return Err(format!("Detections file not found: {}", detections.display()).into());
    }
    let source = ImageSequenceSource::open(frames)?;

    let detector = ReplayFaceDetector::from_path(detections);
    let worker = ThreadedDetectionWorker::start(Box::new(detector), settings.handshake_timeout())?;

    let mut pipeline = FramePipeline::new(
        Box::new(source),
        Box::new(worker),
        session,
        Box::new(LogStatusReporter::new()),
        PipelineConfig::from_settings(settings),
    );
    pipeline.start_warmup()?;
    Ok(pipeline.run()?)
}

fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(ms) = cli.tick_ms {
        settings.tick_interval_ms = ms;
    }
    if let Some(side) = cli.max_side {
        settings.max_working_side = side;
    }
    Ok(settings)
}

fn log_dropped(report: &ImportReport) {
    if !report.dropped.is_empty() {
        log::warn!(
            "{} reference entries were skipped; run `facegate inspect` for details",
            report.dropped.len()
        );
    }
}
