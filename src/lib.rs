//! Track Compare - local audio features vs. reference descriptors
//!
//! This library computes tempo, loudness and energy from decoded audio and
//! reconciles them with the descriptors an external feature service
//! reports for the same track.

pub mod analysis;
pub mod config;
pub mod decode;
pub mod error;
pub mod model;
pub mod reconcile;

pub use analysis::{CancellationToken, LocalAnalyzer};
pub use config::{Config, ExtractionConfig, ReconcileConfig};
pub use error::{AnalysisError, DecodeError};
pub use model::{LocalAnalysisResult, ReferenceFeatureSet, TrackKey};
pub use reconcile::{reconcile, Reconciliation};
