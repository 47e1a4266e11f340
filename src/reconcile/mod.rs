//! Reconciliation of local and reference feature sets
//!
//! Maps local measurements onto the reference scales (energy,
//! danceability, pitch class) and classifies each difference. Stateless
//! and synchronous; safe to call from any number of threads.

mod engine;

pub use engine::{
    bpm_factor, classify_tempo, local_danceability, local_energy, reconcile, ComparisonEntry,
    ComparisonTable, DerivedFeatures, Feature, LocalSummary, Reconciliation, Verdict,
};
