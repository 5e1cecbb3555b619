//! homewatchd - person-watch daemon
//!
//! This daemon:
//! 1. Loads configuration (config file + environment; two required secrets)
//! 2. Opens the durable notification state (precondition: file must exist)
//! 3. Initializes the detector backend explicitly, before the loop
//! 4. Connects to the configured stream and runs the detection loop
//! 5. Saves qualifying frames per day and pushes debounced notifications
//! 6. Stops cleanly on Ctrl-C, stream exhaustion, or reconnect failure

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use homewatch::config::HomewatchConfig;
use homewatch::{
    Alerter, DetectionLoop, DetectorBackend, Notifier, OutputDir, RateLimiter, RtspConfig,
    RtspSource, StreamReader, StubBackend,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Watch a live video stream for persons and notify a mobile device"
)]
struct Args {
    /// Path to the JSON config file.
    #[arg(long, env = "HOMEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Path to an ONNX detection model (requires the backend-tract feature).
    #[arg(long, env = "HOMEWATCH_MODEL_PATH")]
    model: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // Preconditions, surfaced before any frame is read: configuration with
    // both secrets, and a readable notification state file.
    let cfg = HomewatchConfig::load_from(args.config.as_deref())?;
    let limiter = RateLimiter::open(&cfg.state_file, cfg.notify_interval)?;
    let alerter = Alerter::new(Notifier::new(cfg.notify.clone()), limiter);

    let mut detector = build_detector(&args, &cfg)?;
    detector.warm_up()?;
    log::info!("detector backend '{}' ready", detector.name());

    let output = OutputDir::open_for_today(&cfg.output_root)?;
    log::info!("writing detections to {}", output.path().display());

    let source = RtspSource::new(RtspConfig {
        url: cfg.stream.url.clone(),
        target_fps: cfg.stream.target_fps,
        width: cfg.stream.width,
        height: cfg.stream.height,
    })?;
    let mut reader = StreamReader::new(source);
    reader.open();

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::Relaxed);
    })?;

    log::info!(
        "homewatchd running on {} (threshold {:.2}, notify window {}s). Press Ctrl-C to stop.",
        cfg.stream.url,
        cfg.confidence_threshold,
        cfg.notify_interval.as_secs()
    );

    let mut detection_loop = DetectionLoop::new(
        reader,
        detector,
        alerter,
        output,
        cfg.confidence_threshold,
        stop,
    );
    let stats = detection_loop.run()?;

    log::info!(
        "stream released. {} frames processed, {} detections saved",
        stats.frames_processed,
        stats.detections_saved
    );
    Ok(())
}

fn build_detector(args: &Args, cfg: &HomewatchConfig) -> Result<Box<dyn DetectorBackend>> {
    match &args.model {
        Some(model_path) => {
            #[cfg(feature = "backend-tract")]
            {
                let backend = homewatch::TractBackend::new(
                    model_path,
                    cfg.stream.width,
                    cfg.stream.height,
                )?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                let _ = (model_path, cfg);
                anyhow::bail!("--model requires the backend-tract feature")
            }
        }
        None => {
            log::warn!("no model configured - using the stub motion detector");
            Ok(Box::new(StubBackend::new()))
        }
    }
}
