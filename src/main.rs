use clap::Parser;
use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod args;

use args::Args;
use eyesentry::alarm::Command;
use eyesentry::config::AppConfig;
use eyesentry::link::SerialLink;
use eyesentry::pipeline::{FrameReport, Orchestrator};
use eyesentry::source::{LandmarkSource, SyntheticLandmarkSource};
use eyesentry::stats::SessionStats;

#[cfg(feature = "vision")]
const MESH_MODEL: &str = "models/face_mesh.onnx";
#[cfg(feature = "vision")]
const DETECTOR_MODEL: &str = "models/face_detection.onnx";

fn create_source(args: &Args, config: &AppConfig) -> anyhow::Result<Box<dyn LandmarkSource>> {
    if args.synthetic {
        return Ok(Box::new(SyntheticLandmarkSource::new(config.video.fps)));
    }

    #[cfg(feature = "vision")]
    {
        let source =
            eyesentry::vision::MeshLandmarkSource::new(&config.video, MESH_MODEL, DETECTOR_MODEL)?;
        Ok(Box::new(source))
    }

    #[cfg(not(feature = "vision"))]
    {
        println!(
            "{}",
            "Built without the vision feature; using the synthetic source.".yellow()
        );
        Ok(Box::new(SyntheticLandmarkSource::new(config.video.fps)))
    }
}

fn print_transition(report: &FrameReport, command: Command) {
    match command {
        Command::Activate => println!(
            "{}",
            format!(
                "ALARM: eyes closed for {} frames (severity {:?})",
                report.closed_frames, report.severity
            )
            .red()
            .bold()
        ),
        Command::Deactivate => println!("{}", "Eyes open: alarm deactivated".green()),
        _ => {}
    }
    if let Some(err) = &report.command_error {
        println!(
            "{}",
            format!("Actuator not reached ({}); state is tracked anyway", err).yellow()
        );
    }
}

fn print_status(report: &FrameReport) {
    let smoothed = report
        .smoothed_ratio
        .map(|r| format!("{:.3}", r))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "frame {:>6}  ear {}  closed {:>3}  alarm {:?}  link {:?}",
        report.frame_index, smoothed, report.closed_frames, report.alarm, report.link
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // 0. Load Config
    let mut config = AppConfig::load()?;
    if let Some(port) = &args.port {
        config.link.port = port.clone();
    }
    if let Some(index) = args.cam_index {
        config.video.camera_index = index;
    }

    println!(
        "EAR threshold: {}  frames threshold: {}  smoothing window: {}",
        config.detection.eye_closed_threshold,
        config.detection.eyes_closed_frames_threshold,
        config.detection.smoothing_window
    );

    // 1. Landmark Source
    let mut source = create_source(&args, &config)?;
    println!("Landmark source: {}", source.name());

    // 2. Actuator Link
    let mut link = SerialLink::new(config.link.clone());
    if args.no_actuator {
        println!("{}", "Actuator disabled (--no-actuator)".yellow());
    } else {
        match link.connect() {
            Ok(()) => println!(
                "{}",
                format!("Connected to actuator on {}", config.link.port).green()
            ),
            Err(e) => println!(
                "{}",
                format!("Actuator unavailable ({}); alarm will be tracked, not actuated", e)
                    .yellow()
            ),
        }
    }

    // 3. Orchestrator
    let mut orchestrator = Orchestrator::new(config.detection.clone(), link);
    if args.no_actuator {
        orchestrator.set_actuation_enabled(false);
    }
    let mut stats = SessionStats::new();

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    println!("Press Ctrl-C to quit\n");

    // 4. Loop
    // A dead camera fails every capture; back off between retries and
    // give up after a sustained run instead of spinning.
    const MAX_ACQUISITION_FAILURES: u32 = 30;

    let mut frames_done: u64 = 0;
    let mut acquisition_failures: u32 = 0;
    let mut loop_error: Option<anyhow::Error> = None;
    while running.load(Ordering::SeqCst) {
        let input = match source.next_frame() {
            Ok(input) => {
                acquisition_failures = 0;
                input
            }
            Err(e) => {
                acquisition_failures += 1;
                if acquisition_failures >= MAX_ACQUISITION_FAILURES {
                    loop_error = Some(e.context(format!(
                        "frame acquisition failed {} times in a row",
                        acquisition_failures
                    )));
                    break;
                }
                log::warn!("frame acquisition failed: {}", e);
                std::thread::sleep(std::time::Duration::from_millis(100));
                continue;
            }
        };

        let report = orchestrator.process(input);
        stats.record(&report);

        if let Some(command) = report.command {
            print_transition(&report, command);
        } else if args.report_every > 0 && report.frame_index % args.report_every == 0 {
            print_status(&report);
        }

        frames_done += 1;
        if args.frames > 0 && frames_done >= args.frames {
            break;
        }
    }

    // 5. Shutdown: stop pulling frames, best-effort deactivate, report.
    // Runs even when the loop bailed, so the alarm is never left on.
    println!("\nShutting down...");
    orchestrator.shutdown();
    println!("{}", stats.summary());

    match loop_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
