//! In-memory frame container.
//!
//! A `Frame` is a decoded RGB raster handed from the ingestion layer to the
//! detector, and persisted as JPEG when a detection qualifies. Frames are
//! ephemeral: the pipeline holds at most one at a time.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

const JPEG_QUALITY: u8 = 90;

/// A decoded RGB frame (8 bits per channel, row-major, no padding).
#[derive(Clone)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Create a frame from raw RGB bytes. Called by the ingestion layer.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Raw RGB pixel data, for inference.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Encode and write the frame as a JPEG file.
    pub fn save_jpeg(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        encoder
            .encode(&self.data, self.width, self.height, ExtendedColorType::Rgb8)
            .with_context(|| format!("failed to encode {}", path.display()))?;
        Ok(())
    }
}
