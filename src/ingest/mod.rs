//! Frame ingestion.
//!
//! This module provides the frame sources and the `StreamReader` that owns
//! the connection lifecycle:
//! - RTSP streams (IP cameras), with a synthetic `stub://` backend
//! - Reconnect-on-failure policy (release, pause, reopen exactly once)
//!
//! The ingestion layer is responsible for:
//! - Opening and releasing the stream connection (at most one at a time)
//! - Decoding frames into RGB `Frame` instances
//! - Recovering from a single transient read fault per incident
//!
//! A failed reopen is terminal: the reader reports `Disconnected` and the
//! detection loop shuts down rather than entering a reconnect storm.

use std::time::Duration;

use anyhow::Result;

use crate::frame::Frame;

pub mod rtsp;

pub use rtsp::RtspSource;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// A connected source of decoded frames.
///
/// Implementations must tolerate `disconnect` on an already-released
/// connection and `connect` after a previous `disconnect`.
pub trait FrameSource {
    /// Open the underlying connection.
    fn connect(&mut self) -> Result<()>;

    /// Decode the next frame. Errors signal a broken or stalled stream.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Release the underlying connection. Idempotent.
    fn disconnect(&mut self);

    /// Human-readable source address for log messages.
    fn describe(&self) -> String;
}

/// Outcome of a single `StreamReader::read_frame` call.
pub enum FrameRead {
    /// A decoded frame.
    Frame(Frame),
    /// The read failed but the stream was reopened; no frame this cycle.
    Skipped,
    /// The stream is gone and will not come back.
    Disconnected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReaderState {
    Closed,
    Open,
    Terminated,
}

/// Owns a `FrameSource` connection and the reconnect policy.
///
/// State machine: `Closed` -> `open()` -> `Open` -> read failure ->
/// release, pause, reopen once -> `Open` again, or `Terminated` when the
/// reopen fails. `close()` is safe to call in any state.
pub struct StreamReader<S: FrameSource> {
    source: S,
    state: ReaderState,
    reconnect_delay: Duration,
    released: bool,
}

impl<S: FrameSource> StreamReader<S> {
    pub fn new(source: S) -> Self {
        Self::with_reconnect_delay(source, RECONNECT_DELAY)
    }

    /// Reader with a custom reconnect pause. Tests use a zero delay.
    pub fn with_reconnect_delay(source: S, reconnect_delay: Duration) -> Self {
        Self {
            source,
            state: ReaderState::Closed,
            reconnect_delay,
            released: true,
        }
    }

    /// Attempt to open the stream. A failure leaves the reader closed
    /// rather than raising, so the read path can retry once.
    pub fn open(&mut self) {
        if self.state == ReaderState::Terminated {
            return;
        }
        match self.source.connect() {
            Ok(()) => {
                self.state = ReaderState::Open;
                self.released = false;
                log::info!("stream open: {}", self.source.describe());
            }
            Err(e) => {
                log::warn!("stream connect failed ({}): {}", self.source.describe(), e);
                self.state = ReaderState::Closed;
            }
        }
    }

    /// Read the next frame, applying the reconnect policy on failure.
    pub fn read_frame(&mut self) -> FrameRead {
        match self.state {
            ReaderState::Terminated => FrameRead::Disconnected,
            ReaderState::Closed => {
                log::warn!("stream not open - attempting to reconnect");
                self.reconnect()
            }
            ReaderState::Open => match self.source.next_frame() {
                Ok(frame) => FrameRead::Frame(frame),
                Err(e) => {
                    log::warn!("stream read failed ({}) - attempting to reconnect", e);
                    self.reconnect()
                }
            },
        }
    }

    /// Release, pause, reopen exactly once. A failed reopen is terminal.
    fn reconnect(&mut self) -> FrameRead {
        self.release();
        std::thread::sleep(self.reconnect_delay);
        match self.source.connect() {
            Ok(()) => {
                self.state = ReaderState::Open;
                self.released = false;
                log::info!("stream reopened: {}", self.source.describe());
                FrameRead::Skipped
            }
            Err(e) => {
                log::error!("stream reopen failed - giving up: {}", e);
                self.state = ReaderState::Terminated;
                FrameRead::Disconnected
            }
        }
    }

    /// Release the connection and stop the reader. Idempotent.
    pub fn close(&mut self) {
        self.release();
        self.state = ReaderState::Terminated;
    }

    fn release(&mut self) {
        if !self.released {
            self.source.disconnect();
            self.released = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;

    /// Scripted source: each entry is one `next_frame` outcome; `connect`
    /// outcomes are scripted separately.
    struct ScriptedSource {
        connects: VecDeque<bool>,
        reads: VecDeque<Result<Frame>>,
        connect_calls: usize,
        disconnect_calls: usize,
    }

    impl ScriptedSource {
        fn new(connects: Vec<bool>, reads: Vec<Result<Frame>>) -> Self {
            Self {
                connects: connects.into(),
                reads: reads.into(),
                connect_calls: 0,
                disconnect_calls: 0,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn connect(&mut self) -> Result<()> {
            self.connect_calls += 1;
            match self.connects.pop_front() {
                Some(true) => Ok(()),
                Some(false) => Err(anyhow!("scripted connect refusal")),
                None => Err(anyhow!("no more scripted connects")),
            }
        }

        fn next_frame(&mut self) -> Result<Frame> {
            self.reads
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no more scripted reads")))
        }

        fn disconnect(&mut self) {
            self.disconnect_calls += 1;
        }

        fn describe(&self) -> String {
            "scripted://test".to_string()
        }
    }

    fn test_frame(tag: u8) -> Frame {
        Frame::new(vec![tag; 2 * 2 * 3], 2, 2).unwrap()
    }

    fn reader(source: ScriptedSource) -> StreamReader<ScriptedSource> {
        StreamReader::with_reconnect_delay(source, Duration::ZERO)
    }

    #[test]
    fn recovers_from_single_read_failure() {
        let source = ScriptedSource::new(
            vec![true, true],
            vec![
                Ok(test_frame(1)),
                Err(anyhow!("stream stalled")),
                Ok(test_frame(2)),
            ],
        );
        let mut reader = reader(source);
        reader.open();

        let mut seen = Vec::new();
        loop {
            match reader.read_frame() {
                FrameRead::Frame(frame) => seen.push(frame.pixels()[0]),
                FrameRead::Skipped => continue,
                FrameRead::Disconnected => break,
            }
        }

        // one frame before the fault, one after the reopen, none duplicated
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn terminal_after_failed_reopen_releases_once() {
        let source = ScriptedSource::new(
            vec![true, false],
            vec![Err(anyhow!("stream closed by peer"))],
        );
        let mut reader = reader(source);
        reader.open();

        assert!(matches!(reader.read_frame(), FrameRead::Disconnected));
        // terminal state is sticky
        assert!(matches!(reader.read_frame(), FrameRead::Disconnected));

        reader.close();
        reader.close();
        assert_eq!(reader.source.disconnect_calls, 1);
    }

    #[test]
    fn failed_open_is_silent_and_retried_on_read() {
        let source = ScriptedSource::new(vec![false, true], vec![Ok(test_frame(7))]);
        let mut reader = reader(source);
        reader.open();
        assert_eq!(reader.state, ReaderState::Closed);

        // the not-open discovery triggers the single reopen attempt
        assert!(matches!(reader.read_frame(), FrameRead::Skipped));
        assert!(matches!(reader.read_frame(), FrameRead::Frame(_)));
    }

    #[test]
    fn close_before_open_does_not_release() {
        let source = ScriptedSource::new(vec![], vec![]);
        let mut reader = reader(source);
        reader.close();
        assert_eq!(reader.source.disconnect_calls, 0);
        assert!(matches!(reader.read_frame(), FrameRead::Disconnected));
    }
}
