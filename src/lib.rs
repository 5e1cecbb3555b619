//! homewatch - single-camera person watch.
//!
//! This crate implements a small surveillance pipeline: pull frames from a
//! live RTSP stream, run person detection on each frame, persist qualifying
//! frames to a per-day output directory, and push a debounced notification
//! to a mobile device through an authenticated HTTPS endpoint.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources and the reconnecting `StreamReader`
//! - `detect`: detector backends (stub, optional ONNX via tract)
//! - `notify`: notification transport and the durable rate limiter
//! - `storage`: per-day output directory, saved frames, detection journal
//! - `pipeline`: the frame-by-frame detection loop
//! - `config`: daemon configuration (file + environment)
//!
//! The loop is single-threaded and cooperative: the only suspension points
//! are the one-second reconnect pause, the 10 ms per-frame yield, and the
//! blocking notification POST.

use anyhow::Result;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod storage;

#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use detect::{Detection, DetectorBackend, ObjectClass, StubBackend, PERSON_CLASS_INDEX};
pub use frame::Frame;
pub use ingest::{rtsp::RtspConfig, FrameRead, FrameSource, RtspSource, StreamReader};
pub use notify::{Alerter, NotifyConfig, Notifier, RateLimiter};
pub use pipeline::{DetectionLoop, LoopStats};
pub use storage::OutputDir;

/// Seconds since the Unix epoch.
pub fn now_s() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
