//! Error types for decoding, analysis runs and reference validation

use crate::analysis::RunState;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failure turning raw audio bytes into PCM
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The container or codec is not recognised
    #[error("Unsupported audio format: {0}")]
    Unsupported(String),

    /// The stream was recognised but could not be decoded
    #[error("Corrupt audio stream: {0}")]
    Corrupt(String),

    /// No audio track, or the track produced no samples
    #[error("No decodable audio found")]
    NoAudio,
}

/// Failure reading the opaque audio bytes
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read audio file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch audio from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Terminal errors of an analysis run
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Source(#[from] SourceError),

    /// The caller revoked the cancellation token
    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Invalid analysis state transition: {from:?} -> {to:?}")]
    InvalidState { from: RunState, to: RunState },
}

/// Why a reference field cannot be compared
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidReference {
    #[error("value missing or not numeric")]
    Missing,

    #[error("value is not a finite number")]
    NotFinite,

    #[error("value {value} outside {min}..={max}")]
    OutOfRange { value: f32, min: f32, max: f32 },

    #[error("value {value} is negative")]
    Negative { value: f32 },

    #[error("key index {index} outside 0-11")]
    KeyOutOfRange { index: i32 },
}

/// Failure loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
