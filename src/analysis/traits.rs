//! Analysis trait definitions

use crate::model::{AudioBuffer, TrackKey};

/// Musical key detection backend
pub trait KeyDetector {
    /// Estimate the key of a decoded buffer
    fn detect(&self, buffer: &AudioBuffer) -> TrackKey;

    /// Get the name of this detector (for logging)
    fn name(&self) -> &'static str;
}
