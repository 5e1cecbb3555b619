use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// Backends receive an RGB pixel slice and a class-index filter and return
/// the detections whose class is in the filter. Implementations must treat
/// the pixel slice as read-only and ephemeral.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame, restricted to the given class indices.
    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        classes: &[usize],
    ) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the loop starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
