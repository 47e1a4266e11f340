//! Decoder trait definition

use crate::error::DecodeError;
use crate::model::AudioBuffer;

/// Decoder trait - allows swapping the decode backend
pub trait Decoder {
    /// Decode raw container bytes into PCM.
    /// `hint` is an optional file extension used to speed up format probing.
    fn decode(&self, bytes: &[u8], hint: Option<&str>) -> Result<AudioBuffer, DecodeError>;

    /// Name of this decoder (for logging)
    fn name(&self) -> &'static str;
}
