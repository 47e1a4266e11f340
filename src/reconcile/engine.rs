//! Cross-source reconciliation
//!
//! Pure functions: the same local result, reference record and config
//! always produce the same table.

use crate::config::ReconcileConfig;
use crate::error::InvalidReference;
use crate::model::{LocalAnalysisResult, ReferenceFeatureSet};
use serde::Serialize;
use std::fmt;

/// Features present in the comparison table, in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Tempo,
    Key,
    Loudness,
    Energy,
    Danceability,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Tempo,
        Feature::Key,
        Feature::Loudness,
        Feature::Energy,
        Feature::Danceability,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Tempo => "tempo",
            Feature::Key => "key",
            Feature::Loudness => "loudness",
            Feature::Energy => "energy",
            Feature::Danceability => "danceability",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of comparing one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Tempo difference below the threshold
    Precise,
    /// Tempo difference at or above the threshold
    Deviation,
    Match,
    Mismatch,
    /// Reference value missing or invalid
    NotComparable,
}

impl Verdict {
    pub fn name(&self) -> &'static str {
        match self {
            Verdict::Precise => "precise",
            Verdict::Deviation => "deviation",
            Verdict::Match => "match",
            Verdict::Mismatch => "mismatch",
            Verdict::NotComparable => "not comparable",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the comparison table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonEntry {
    pub feature: Feature,

    /// Local value on the reference scale (`None` for an unknown key)
    pub local: Option<f32>,

    /// Reference value (`None` when missing or invalid)
    pub reference: Option<f32>,

    /// Absolute difference; for keys, the circular semitone distance
    pub abs_diff: Option<f32>,

    pub matches: bool,

    pub verdict: Verdict,

    /// Why the reference value could not be used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid: Option<InvalidReference>,
}

impl ComparisonEntry {
    fn not_comparable(feature: Feature, local: Option<f32>, reason: InvalidReference) -> Self {
        log::warn!("Reference {} not comparable: {}", feature, reason);
        Self {
            feature,
            local,
            reference: None,
            abs_diff: None,
            matches: false,
            verdict: Verdict::NotComparable,
            invalid: Some(reason),
        }
    }

    fn within(feature: Feature, local: f32, reference: f32, tolerance: f32) -> Self {
        let diff = (reference - local).abs();
        let matches = diff <= tolerance;
        Self {
            feature,
            local: Some(local),
            reference: Some(reference),
            abs_diff: Some(diff),
            matches,
            verdict: if matches { Verdict::Match } else { Verdict::Mismatch },
            invalid: None,
        }
    }
}

/// Local values as reported when there is nothing to compare against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalSummary {
    pub bpm: f32,
    pub loudness: f32,
    pub rms: f32,
}

/// Local values mapped onto the reference 0-1 scales
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedFeatures {
    pub energy: f32,
    pub danceability: f32,
}

/// Full comparison against a reference record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub entries: Vec<ComparisonEntry>,
    pub derived: DerivedFeatures,
}

impl ComparisonTable {
    pub fn entry(&self, feature: Feature) -> Option<&ComparisonEntry> {
        self.entries.iter().find(|e| e.feature == feature)
    }

    /// Tempo classification (`NotComparable` without a usable reference tempo)
    pub fn tempo_verdict(&self) -> Verdict {
        self.entry(Feature::Tempo)
            .map(|e| e.verdict)
            .unwrap_or(Verdict::NotComparable)
    }
}

/// Result of reconciliation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reconciliation {
    /// No reference record was supplied
    LocalOnly(LocalSummary),
    Comparison(ComparisonTable),
}

/// `clamp(rms * energy_scale, 0, 1)`
pub fn local_energy(rms: f32, config: &ReconcileConfig) -> f32 {
    (rms * config.energy_scale).clamp(0.0, 1.0)
}

/// 1 inside the danceable band (exclusive bounds), `off_band_factor` outside
pub fn bpm_factor(bpm: f32, config: &ReconcileConfig) -> f32 {
    if bpm > config.danceable_min_bpm && bpm < config.danceable_max_bpm {
        1.0
    } else {
        config.off_band_factor
    }
}

/// `clamp(energy * bpm_factor * stability_factor, 0, 1)`; 0 when no tempo
/// or no energy was measured
pub fn local_danceability(bpm: f32, energy: f32, config: &ReconcileConfig) -> f32 {
    if bpm <= 0.0 || energy <= 0.0 {
        return 0.0;
    }
    (energy * bpm_factor(bpm, config) * config.stability_factor).clamp(0.0, 1.0)
}

/// `Precise` strictly below the threshold, `Deviation` at or above it
pub fn classify_tempo(diff: f32, config: &ReconcileConfig) -> Verdict {
    if diff < config.tempo_threshold {
        Verdict::Precise
    } else {
        Verdict::Deviation
    }
}

/// Shortest distance between two pitch classes around the circle (0-6)
fn pitch_class_distance(a: i32, b: i32) -> i32 {
    let d = (a - b).rem_euclid(12);
    d.min(12 - d)
}

/// Compare a finalized local result with an optional reference record
pub fn reconcile(
    local: &LocalAnalysisResult,
    reference: Option<&ReferenceFeatureSet>,
    config: &ReconcileConfig,
) -> Reconciliation {
    let Some(reference) = reference else {
        return Reconciliation::LocalOnly(LocalSummary {
            bpm: local.bpm(),
            loudness: local.loudness(),
            rms: local.rms(),
        });
    };

    let energy = local_energy(local.rms(), config);
    let danceability = local_danceability(local.bpm(), energy, config);

    let entries = vec![
        compare_tempo(local.bpm(), reference, config),
        compare_key(local, reference),
        match reference.checked_loudness() {
            Ok(r) => ComparisonEntry::within(
                Feature::Loudness,
                local.loudness(),
                r,
                config.loudness_tolerance_db,
            ),
            Err(e) => ComparisonEntry::not_comparable(Feature::Loudness, Some(local.loudness()), e),
        },
        match reference.checked_energy() {
            Ok(r) => ComparisonEntry::within(Feature::Energy, energy, r, config.feature_tolerance),
            Err(e) => ComparisonEntry::not_comparable(Feature::Energy, Some(energy), e),
        },
        match reference.checked_danceability() {
            Ok(r) => ComparisonEntry::within(
                Feature::Danceability,
                danceability,
                r,
                config.feature_tolerance,
            ),
            Err(e) => ComparisonEntry::not_comparable(Feature::Danceability, Some(danceability), e),
        },
    ];

    Reconciliation::Comparison(ComparisonTable {
        entries,
        derived: DerivedFeatures {
            energy,
            danceability,
        },
    })
}

fn compare_tempo(bpm: f32, reference: &ReferenceFeatureSet, config: &ReconcileConfig) -> ComparisonEntry {
    match reference.checked_tempo() {
        Ok(tempo) => {
            let diff = (tempo - bpm).abs();
            let verdict = classify_tempo(diff, config);
            ComparisonEntry {
                feature: Feature::Tempo,
                local: Some(bpm),
                reference: Some(tempo),
                abs_diff: Some(diff),
                matches: verdict == Verdict::Precise,
                verdict,
                invalid: None,
            }
        }
        Err(e) => ComparisonEntry::not_comparable(Feature::Tempo, Some(bpm), e),
    }
}

fn compare_key(local: &LocalAnalysisResult, reference: &ReferenceFeatureSet) -> ComparisonEntry {
    let local_pc = local.key().pitch_class().map(i32::from);
    match reference.checked_key() {
        Ok(reference_pc) => {
            let matches = local.key().matches_pitch_class(reference_pc);
            ComparisonEntry {
                feature: Feature::Key,
                local: local_pc.map(|pc| pc as f32),
                reference: Some(reference_pc as f32),
                abs_diff: local_pc.map(|pc| pitch_class_distance(pc, reference_pc) as f32),
                matches,
                verdict: if matches { Verdict::Match } else { Verdict::Mismatch },
                invalid: None,
            }
        }
        Err(e) => ComparisonEntry::not_comparable(Feature::Key, local_pc.map(|pc| pc as f32), e),
    }
}
