//! Durable notification debounce state.
//!
//! The rate limiter owns a single plaintext file holding the Unix timestamp
//! of the last notification attempt. The file survives process restarts and
//! must be pre-populated before first run; a missing or malformed file is a
//! startup precondition failure, not a runtime condition.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

pub struct RateLimiter {
    state_path: PathBuf,
    min_interval: Duration,
    last_notified: u64,
}

impl RateLimiter {
    /// Open the durable state file and parse the stored timestamp.
    ///
    /// Populate the file before first run, e.g.
    /// `echo "0" > /tmp/homewatch_last_notify`.
    pub fn open(state_path: impl Into<PathBuf>, min_interval: Duration) -> Result<Self> {
        let state_path = state_path.into();
        let raw = fs::read_to_string(&state_path).with_context(|| {
            format!(
                "failed to read notification state file {}",
                state_path.display()
            )
        })?;
        let last_notified = raw.trim().parse::<u64>().map_err(|_| {
            anyhow!(
                "notification state file {} does not contain a decimal Unix timestamp",
                state_path.display()
            )
        })?;
        Ok(Self {
            state_path,
            min_interval,
            last_notified,
        })
    }

    pub fn last_notified(&self) -> u64 {
        self.last_notified
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// True when the debounce window has elapsed and a send may fire.
    pub fn may_notify(&self, now_s: u64) -> bool {
        now_s.saturating_sub(self.last_notified) >= self.min_interval.as_secs()
    }

    /// Record a notification attempt and persist the new timestamp.
    ///
    /// The stored value never goes backwards.
    pub fn record_attempt(&mut self, now_s: u64) -> Result<()> {
        self.last_notified = self.last_notified.max(now_s);
        fs::write(&self.state_path, self.last_notified.to_string()).with_context(|| {
            format!(
                "failed to write notification state file {}",
                self.state_path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const WINDOW: Duration = Duration::from_secs(30);

    fn state_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp state file");
        file.write_all(contents.as_bytes()).expect("write state");
        file
    }

    #[test]
    fn missing_state_file_fails() {
        let err = RateLimiter::open("/nonexistent/homewatch_state", WINDOW);
        assert!(err.is_err());
    }

    #[test]
    fn empty_state_file_fails() {
        let file = state_file("");
        assert!(RateLimiter::open(file.path(), WINDOW).is_err());
    }

    #[test]
    fn malformed_state_file_fails() {
        let file = state_file("not-a-timestamp");
        assert!(RateLimiter::open(file.path(), WINDOW).is_err());
    }

    #[test]
    fn debounce_window_boundaries() {
        let file = state_file("1000");
        let limiter = RateLimiter::open(file.path(), WINDOW).unwrap();

        assert!(!limiter.may_notify(1000));
        assert!(!limiter.may_notify(1029));
        assert!(limiter.may_notify(1030));
        assert!(limiter.may_notify(2000));
    }

    #[test]
    fn record_attempt_persists_across_reopen() {
        let file = state_file("1000");
        let mut limiter = RateLimiter::open(file.path(), WINDOW).unwrap();
        limiter.record_attempt(5000).unwrap();

        let reopened = RateLimiter::open(file.path(), WINDOW).unwrap();
        assert_eq!(reopened.last_notified(), 5000);
    }

    #[test]
    fn stored_timestamp_never_goes_backwards() {
        let file = state_file("5000");
        let mut limiter = RateLimiter::open(file.path(), WINDOW).unwrap();
        limiter.record_attempt(4000).unwrap();
        assert_eq!(limiter.last_notified(), 5000);
    }
}
