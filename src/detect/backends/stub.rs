use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, ObjectClass, PERSON_CLASS_INDEX};

const STUB_CONFIDENCE: f32 = 0.85;

/// Stub backend. Uses pixel hashing to detect scene change and reports it
/// as a full-frame person detection. Used by the demo path and tests.
pub struct StubBackend {
    last_hash: Option<[u8; 32]>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { last_hash: None }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(
        &mut self,
        pixels: &[u8],
        _width: u32,
        _height: u32,
        classes: &[usize],
    ) -> Result<Vec<Detection>> {
        let current_hash: [u8; 32] = Sha256::digest(pixels).into();

        let changed = match self.last_hash {
            Some(prev) => prev != current_hash,
            None => false,
        };
        self.last_hash = Some(current_hash);

        if !changed || !classes.contains(&PERSON_CLASS_INDEX) {
            return Ok(Vec::new());
        }

        Ok(vec![Detection {
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
            confidence: STUB_CONFIDENCE,
            class: ObjectClass::Person,
        }])
    }
}
