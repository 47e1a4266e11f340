//! Tunable constants for extraction and reconciliation
//!
//! Every knob has a named default. A TOML file may override any subset:
//!
//! ```toml
//! [extraction]
//! frame_size = 4096
//!
//! [reconcile]
//! energy_scale = 10.0
//! danceable_min_bpm = 90.0
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Samples per analysis frame
pub const DEFAULT_FRAME_SIZE: usize = 4096;
/// Samples per onset-detection block (frames are split into these)
pub const DEFAULT_ONSET_BLOCK: usize = 512;

/// Multiplier mapping mean RMS onto the reference 0-1 energy scale
pub const DEFAULT_ENERGY_SCALE: f32 = 2.5;
/// Lower bound of the danceable tempo band (exclusive)
pub const DEFAULT_DANCEABLE_MIN_BPM: f32 = 100.0;
/// Upper bound of the danceable tempo band (exclusive)
pub const DEFAULT_DANCEABLE_MAX_BPM: f32 = 140.0;
/// Danceability factor applied outside the danceable band
pub const DEFAULT_OFF_BAND_FACTOR: f32 = 0.7;
/// Tempo differences strictly below this are "precise"
pub const DEFAULT_TEMPO_THRESHOLD: f32 = 5.0;

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub reconcile: ReconcileConfig,
}

impl Config {
    /// Load a TOML file; keys that are absent keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Streaming extractor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Samples per non-overlapping frame
    pub frame_size: usize,

    /// Samples per onset-detection block
    pub onset_block: usize,

    /// Tempo candidates are folded (doubled/halved) into this range
    pub min_bpm: f32,
    pub max_bpm: f32,

    /// A block is an onset when its energy exceeds the recent mean by this factor
    pub onset_sensitivity: f32,

    /// Minimum spacing between two onsets
    pub min_onset_gap_ms: f32,

    /// Number of past blocks in the running energy mean
    pub energy_history: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            onset_block: DEFAULT_ONSET_BLOCK,
            min_bpm: 70.0,
            max_bpm: 170.0,
            onset_sensitivity: 1.5,
            min_onset_gap_ms: 100.0,
            energy_history: 43,
        }
    }
}

impl ExtractionConfig {
    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    /// Create config with custom BPM range
    pub fn with_bpm_range(mut self, min: f32, max: f32) -> Self {
        self.min_bpm = min;
        self.max_bpm = max;
        self
    }

    /// Frame size clamped to at least one sample
    pub(crate) fn effective_frame_size(&self) -> usize {
        self.frame_size.max(1)
    }

    /// Onset block clamped to 1..=frame_size
    pub(crate) fn effective_onset_block(&self) -> usize {
        self.onset_block.clamp(1, self.effective_frame_size())
    }
}

/// Scale normalization and classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// `local_energy = clamp(rms * energy_scale, 0, 1)`
    pub energy_scale: f32,

    /// Danceable tempo band, both bounds exclusive
    pub danceable_min_bpm: f32,
    pub danceable_max_bpm: f32,

    /// bpm factor outside the danceable band
    pub off_band_factor: f32,

    /// Rhythmic regularity factor. Regularity is not measured, so this
    /// stays a constant.
    pub stability_factor: f32,

    /// Tempo differences strictly below this are precise
    pub tempo_threshold: f32,

    /// Loudness entries match within this many dB
    pub loudness_tolerance_db: f32,

    /// Energy and danceability entries match within this distance
    pub feature_tolerance: f32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            energy_scale: DEFAULT_ENERGY_SCALE,
            danceable_min_bpm: DEFAULT_DANCEABLE_MIN_BPM,
            danceable_max_bpm: DEFAULT_DANCEABLE_MAX_BPM,
            off_band_factor: DEFAULT_OFF_BAND_FACTOR,
            stability_factor: 1.0,
            tempo_threshold: DEFAULT_TEMPO_THRESHOLD,
            loudness_tolerance_db: 3.0,
            feature_tolerance: 0.1,
        }
    }
}

impl ReconcileConfig {
    /// Alternative calibration: RMS scaled by 10 and a 90-140 BPM band
    pub fn wide_band() -> Self {
        Self {
            energy_scale: 10.0,
            danceable_min_bpm: 90.0,
            ..Self::default()
        }
    }

    pub fn with_energy_scale(mut self, scale: f32) -> Self {
        self.energy_scale = scale;
        self
    }

    pub fn with_danceable_band(mut self, min: f32, max: f32) -> Self {
        self.danceable_min_bpm = min;
        self.danceable_max_bpm = max;
        self
    }

    pub fn with_off_band_factor(mut self, factor: f32) -> Self {
        self.off_band_factor = factor;
        self
    }

    pub fn with_tempo_threshold(mut self, threshold: f32) -> Self {
        self.tempo_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            "[reconcile]\nenergy_scale = 10.0\ndanceable_min_bpm = 90.0\n\n[extraction]\nframe_size = 2048\n",
        )
        .unwrap();

        assert_eq!(config.reconcile, ReconcileConfig::wide_band());
        assert_eq!(config.extraction.frame_size, 2048);
        assert_eq!(config.extraction.onset_block, DEFAULT_ONSET_BLOCK);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml("[reconcile]\nenergy_scale = \"loud\"").is_err());
    }

    #[test]
    fn test_onset_block_never_exceeds_frame() {
        let config = ExtractionConfig::default().with_frame_size(256);
        assert_eq!(config.effective_onset_block(), 256);

        let zero = ExtractionConfig::default().with_frame_size(0);
        assert_eq!(zero.effective_frame_size(), 1);
    }
}
