//! Local audio analysis
//!
//! Decoded audio is walked frame by frame ([`FrameExtractor`]), folded into
//! a single result ([`Aggregator`]) and the whole pass is tracked by an
//! [`AnalysisRun`] state machine. [`LocalAnalyzer`] ties these together.
//!
//! Key detection sits behind [`KeyDetector`]; the shipped
//! [`UnimplementedKeyDetector`] always reports `Unknown`.

mod aggregator;
mod analyzer;
mod cancel;
mod extractor;
mod run;
pub mod stats;
mod stub;
mod traits;

pub use aggregator::Aggregator;
pub use analyzer::LocalAnalyzer;
pub use cancel::CancellationToken;
pub use extractor::{fold_bpm, frame_rms, loudness_dbfs, FrameExtractor};
pub use run::{AnalysisRun, RunState};
pub use stub::UnimplementedKeyDetector;
pub use traits::KeyDetector;
