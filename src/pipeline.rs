//! The frame-by-frame detection loop.
//!
//! `DetectionLoop` drives the cycle: pull a frame from the `StreamReader`,
//! run the detector restricted to the person class, persist every
//! qualifying detection, and hand it to the notification step. The loop
//! runs until the stream terminates or the stop flag is raised.
//!
//! Failure semantics: detector and frame-save errors propagate out of
//! `run` and end the process; the notification step contains its own
//! failures and never stops the loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::detect::{Detection, DetectorBackend, PERSON_CLASS_INDEX};
use crate::ingest::{FrameRead, FrameSource, StreamReader};
use crate::notify::Alerter;
use crate::storage::OutputDir;

/// Cooperative yield between frames. Not a back-pressure mechanism.
const FRAME_YIELD: Duration = Duration::from_millis(10);

/// A qualifying detection, as consumed by the journal and the
/// notification step. Not retained after the iteration.
pub struct DetectionEvent<'a> {
    pub detection: &'a Detection,
    pub saved_path: PathBuf,
    pub timestamp_s: u64,
}

/// Counters reported when the loop exits.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoopStats {
    pub frames_processed: u64,
    pub detections_saved: u64,
}

pub struct DetectionLoop<S: FrameSource> {
    reader: StreamReader<S>,
    detector: Box<dyn DetectorBackend>,
    alerter: Alerter,
    output: OutputDir,
    confidence_threshold: f32,
    stop: Arc<AtomicBool>,
    /// Frame counter; used only to derive unique saved-file names.
    frame_index: u64,
    frame_yield: Duration,
}

impl<S: FrameSource> DetectionLoop<S> {
    pub fn new(
        reader: StreamReader<S>,
        detector: Box<dyn DetectorBackend>,
        alerter: Alerter,
        output: OutputDir,
        confidence_threshold: f32,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader,
            detector,
            alerter,
            output,
            confidence_threshold,
            stop,
            frame_index: 0,
            frame_yield: FRAME_YIELD,
        }
    }

    /// Replace the per-frame yield. Tests run with zero.
    pub fn with_frame_yield(mut self, frame_yield: Duration) -> Self {
        self.frame_yield = frame_yield;
        self
    }

    /// Run until the stream terminates or the stop flag is raised. The
    /// stream connection is released before returning.
    pub fn run(&mut self) -> Result<LoopStats> {
        let mut stats = LoopStats::default();

        loop {
            if self.stop.load(Ordering::Relaxed) {
                log::info!("interrupt received - stopping");
                break;
            }

            let frame = match self.reader.read_frame() {
                FrameRead::Frame(frame) => frame,
                FrameRead::Skipped => continue,
                FrameRead::Disconnected => {
                    log::info!("stream ended - stopping");
                    break;
                }
            };

            let detections = self.detector.detect(
                frame.pixels(),
                frame.width,
                frame.height,
                &[PERSON_CLASS_INDEX],
            )?;

            for detection in &detections {
                // strictly above the threshold; the boundary value does not qualify
                if detection.confidence <= self.confidence_threshold {
                    continue;
                }
                log::info!("high-confidence detection: {:.3}", detection.confidence);

                let saved_path = self.output.save_frame(&frame, self.frame_index)?;
                let event = DetectionEvent {
                    detection,
                    saved_path,
                    timestamp_s: crate::now_s()?,
                };
                self.output.journal(&format!(
                    "confidence={:.3} ts={} saved={}",
                    event.detection.confidence,
                    event.timestamp_s,
                    event.saved_path.display()
                ))?;
                log::info!("saved detection: {}", event.saved_path.display());
                stats.detections_saved += 1;

                self.alerter.notify_person();
            }

            self.frame_index += 1;
            stats.frames_processed += 1;
            std::thread::sleep(self.frame_yield);
        }

        self.reader.close();
        Ok(stats)
    }
}
