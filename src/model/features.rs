use super::TrackKey;
use crate::error::InvalidReference;
use serde::{Deserialize, Deserializer, Serialize};

/// Per-frame measurements emitted by the extractor
///
/// Consumed immediately by the aggregator and never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFeatures {
    /// Zero-based frame index within the run
    pub index: usize,

    /// Tempo candidate in BPM (always > 0 when present)
    pub tempo: Option<f32>,

    /// Loudness in dBFS
    pub loudness: Option<f32>,

    /// RMS energy (0.0-1.0)
    pub rms: Option<f32>,
}

impl FrameFeatures {
    /// A frame that contributed nothing
    pub fn empty(index: usize) -> Self {
        Self {
            index,
            tempo: None,
            loudness: None,
            rms: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tempo.is_none() && self.loudness.is_none() && self.rms.is_none()
    }
}

/// Final result of one local analysis run
///
/// Built once by the aggregator at end of stream and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalAnalysisResult {
    bpm: f32,
    loudness: f32,
    rms: f32,
    key: TrackKey,
}

impl LocalAnalysisResult {
    /// Build a result from values produced elsewhere (e.g. a cached report).
    /// `bpm` is clamped to >= 0 and `rms` to 0.0-1.0; non-finite values become 0.
    pub fn from_parts(bpm: f32, loudness: f32, rms: f32, key: TrackKey) -> Self {
        Self {
            bpm: finite_or_zero(bpm).max(0.0),
            loudness: finite_or_zero(loudness),
            rms: finite_or_zero(rms).clamp(0.0, 1.0),
            key,
        }
    }

    /// Zeroed result for a signal that yielded no valid frames
    pub fn silent(key: TrackKey) -> Self {
        Self::from_parts(0.0, 0.0, 0.0, key)
    }

    /// Most frequent rounded tempo candidate (0 when none was found)
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Mean loudness in dBFS
    pub fn loudness(&self) -> f32 {
        self.loudness
    }

    /// Mean RMS energy
    pub fn rms(&self) -> f32 {
        self.rms
    }

    pub fn key(&self) -> TrackKey {
        self.key
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Descriptors supplied by the external feature service
///
/// Every field is optional on input; the service may omit fields or send
/// `null`, and uses `key = -1` when it could not detect a key. A field of
/// the wrong JSON type reads as missing instead of rejecting the record.
/// Unknown fields in the record are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFeatureSet {
    /// Tempo in BPM
    #[serde(default, deserialize_with = "lenient_number")]
    pub tempo: Option<f32>,

    /// Pitch class 0-11
    #[serde(default, deserialize_with = "lenient_key")]
    pub key: Option<i32>,

    /// Integrated loudness in dB
    #[serde(default, deserialize_with = "lenient_number")]
    pub loudness: Option<f32>,

    /// Energy 0.0-1.0
    #[serde(default, deserialize_with = "lenient_number")]
    pub energy: Option<f32>,

    /// Danceability 0.0-1.0
    #[serde(default, deserialize_with = "lenient_number")]
    pub danceability: Option<f32>,
}

impl ReferenceFeatureSet {
    /// Fully populated reference record
    pub fn new(tempo: f32, key: i32, loudness: f32, energy: f32, danceability: f32) -> Self {
        Self {
            tempo: Some(tempo),
            key: Some(key),
            loudness: Some(loudness),
            energy: Some(energy),
            danceability: Some(danceability),
        }
    }

    /// Parse a JSON record as returned by the feature service
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn checked_tempo(&self) -> Result<f32, InvalidReference> {
        let tempo = finite(self.tempo)?;
        if tempo < 0.0 {
            return Err(InvalidReference::Negative { value: tempo });
        }
        Ok(tempo)
    }

    pub fn checked_key(&self) -> Result<i32, InvalidReference> {
        match self.key {
            None => Err(InvalidReference::Missing),
            Some(k) if (0..=11).contains(&k) => Ok(k),
            Some(k) => Err(InvalidReference::KeyOutOfRange { index: k }),
        }
    }

    pub fn checked_loudness(&self) -> Result<f32, InvalidReference> {
        finite(self.loudness)
    }

    pub fn checked_energy(&self) -> Result<f32, InvalidReference> {
        unit_interval(self.energy)
    }

    pub fn checked_danceability(&self) -> Result<f32, InvalidReference> {
        unit_interval(self.danceability)
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f32>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).map(|v| v as f32))
}

fn lenient_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_f64())
        .filter(|v| v.fract() == 0.0 && v.abs() <= f64::from(i32::MAX))
        .map(|v| v as i32))
}

fn finite(value: Option<f32>) -> Result<f32, InvalidReference> {
    match value {
        None => Err(InvalidReference::Missing),
        Some(v) if !v.is_finite() => Err(InvalidReference::NotFinite),
        Some(v) => Ok(v),
    }
}

fn unit_interval(value: Option<f32>) -> Result<f32, InvalidReference> {
    let v = finite(value)?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(InvalidReference::OutOfRange {
            value: v,
            min: 0.0,
            max: 1.0,
        })
    }
}
