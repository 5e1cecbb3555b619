//! Per-day output directory.
//!
//! All durable artifacts live under `<root>/<YYYY-MM-DD>/`: the saved
//! detection frames (`person_detected_{index:06}.jpg`, unique per frame
//! index) and the `detection.log` journal of qualifying detections.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use crate::frame::Frame;

const JOURNAL_FILE: &str = "detection.log";

pub struct OutputDir {
    day_dir: PathBuf,
}

impl OutputDir {
    /// Open (creating if absent) the directory for the current date.
    pub fn open_for_today(root: &Path) -> Result<Self> {
        Self::open_for_date(root, Local::now().date_naive())
    }

    pub fn open_for_date(root: &Path, date: NaiveDate) -> Result<Self> {
        let day_dir = root.join(date.format("%Y-%m-%d").to_string());
        fs::create_dir_all(&day_dir)
            .with_context(|| format!("failed to create output directory {}", day_dir.display()))?;
        Ok(Self { day_dir })
    }

    pub fn path(&self) -> &Path {
        &self.day_dir
    }

    /// Saved-frame path for a frame index. Indices come from the loop's
    /// monotonically increasing counter, so paths are unique and ordered.
    pub fn frame_path(&self, frame_index: u64) -> PathBuf {
        self.day_dir
            .join(format!("person_detected_{:06}.jpg", frame_index))
    }

    pub fn save_frame(&self, frame: &Frame, frame_index: u64) -> Result<PathBuf> {
        let path = self.frame_path(frame_index);
        frame.save_jpeg(&path)?;
        Ok(path)
    }

    /// Append a timestamped line to the per-day detection journal.
    pub fn journal(&self, message: &str) -> Result<()> {
        let path = self.day_dir.join(JOURNAL_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open journal {}", path.display()))?;
        writeln!(
            file,
            "{} | {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        )
        .with_context(|| format!("failed to append to journal {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_per_day_directory() -> Result<()> {
        let root = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let output = OutputDir::open_for_date(root.path(), date)?;
        assert!(output.path().ends_with("2026-08-06"));
        assert!(output.path().is_dir());
        Ok(())
    }

    #[test]
    fn frame_paths_are_unique_and_ordered() -> Result<()> {
        let root = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let output = OutputDir::open_for_date(root.path(), date)?;

        let a = output.frame_path(5);
        let b = output.frame_path(6);
        assert!(a.to_string_lossy().ends_with("person_detected_000005.jpg"));
        assert!(b.to_string_lossy().ends_with("person_detected_000006.jpg"));
        assert!(a < b);
        Ok(())
    }

    #[test]
    fn journal_appends_timestamped_lines() -> Result<()> {
        let root = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let output = OutputDir::open_for_date(root.path(), date)?;

        output.journal("first")?;
        output.journal("second")?;

        let contents = fs::read_to_string(output.path().join(JOURNAL_FILE))?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("| first"));
        assert!(lines[1].ends_with("| second"));
        Ok(())
    }
}
