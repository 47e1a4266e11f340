//! Placeholder key detector
//!
//! Key estimation is not implemented. This detector makes the gap explicit
//! by always answering `Unknown`, which reconciliation treats as "never
//! matches". A real pitch-class estimator can be plugged in through
//! [`KeyDetector`] without touching the rest of the pipeline.

use super::traits::KeyDetector;
use crate::model::{AudioBuffer, TrackKey};

/// Key detector that never detects a key
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedKeyDetector;

impl UnimplementedKeyDetector {
    pub fn new() -> Self {
        Self
    }
}

impl KeyDetector for UnimplementedKeyDetector {
    fn detect(&self, _buffer: &AudioBuffer) -> TrackKey {
        log::debug!("Key detection not implemented, reporting Unknown");
        TrackKey::Unknown
    }

    fn name(&self) -> &'static str {
        "unimplemented"
    }
}
