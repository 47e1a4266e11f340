//! Data model shared by the extraction and reconciliation stages
//!
//! These types are independent of the decoder backend and of the
//! service that supplies reference features.

mod audio;
mod features;
mod key;

pub use audio::AudioBuffer;
pub use features::{FrameFeatures, LocalAnalysisResult, ReferenceFeatureSet};
pub use key::TrackKey;
