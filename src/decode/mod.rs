//! Decoder adapter
//!
//! Turning container bytes into PCM is delegated to an external decode
//! capability. The pipeline only depends on the [`Decoder`] trait; the
//! shipped implementation wraps symphonia.

mod backend;
mod source;
mod traits;

pub use backend::SymphoniaDecoder;
pub use source::{AudioSource, EncodedAudio};
pub use traits::Decoder;
