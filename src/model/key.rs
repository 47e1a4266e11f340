use serde::{Deserialize, Serialize};
use std::fmt;

/// Musical key as a pitch class, independent of octave and mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKey {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,

    /// No key could be determined
    Unknown,
}

impl TrackKey {
    /// All twelve pitch classes in index order (C = 0 ... B = 11)
    pub const PITCH_CLASSES: [TrackKey; 12] = [
        TrackKey::C,
        TrackKey::CSharp,
        TrackKey::D,
        TrackKey::DSharp,
        TrackKey::E,
        TrackKey::F,
        TrackKey::FSharp,
        TrackKey::G,
        TrackKey::GSharp,
        TrackKey::A,
        TrackKey::ASharp,
        TrackKey::B,
    ];

    /// Map a pitch-class index to a key. Anything outside 0-11 is `Unknown`.
    pub fn from_pitch_class(index: i32) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::PITCH_CLASSES.get(i).copied())
            .unwrap_or(TrackKey::Unknown)
    }

    /// Pitch-class index (0-11), or `None` for `Unknown`
    pub fn pitch_class(&self) -> Option<u8> {
        match self {
            TrackKey::C => Some(0),
            TrackKey::CSharp => Some(1),
            TrackKey::D => Some(2),
            TrackKey::DSharp => Some(3),
            TrackKey::E => Some(4),
            TrackKey::F => Some(5),
            TrackKey::FSharp => Some(6),
            TrackKey::G => Some(7),
            TrackKey::GSharp => Some(8),
            TrackKey::A => Some(9),
            TrackKey::ASharp => Some(10),
            TrackKey::B => Some(11),
            TrackKey::Unknown => None,
        }
    }

    /// Get human-readable key name
    pub fn name(&self) -> &'static str {
        match self {
            TrackKey::C => "C",
            TrackKey::CSharp => "C#",
            TrackKey::D => "D",
            TrackKey::DSharp => "D#",
            TrackKey::E => "E",
            TrackKey::F => "F",
            TrackKey::FSharp => "F#",
            TrackKey::G => "G",
            TrackKey::GSharp => "G#",
            TrackKey::A => "A",
            TrackKey::ASharp => "A#",
            TrackKey::B => "B",
            TrackKey::Unknown => "Unknown",
        }
    }

    /// Parse a key name such as "F#" or "Db" (flats are folded onto sharps)
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "c" | "b#" => TrackKey::C,
            "c#" | "db" => TrackKey::CSharp,
            "d" => TrackKey::D,
            "d#" | "eb" => TrackKey::DSharp,
            "e" | "fb" => TrackKey::E,
            "f" | "e#" => TrackKey::F,
            "f#" | "gb" => TrackKey::FSharp,
            "g" => TrackKey::G,
            "g#" | "ab" => TrackKey::GSharp,
            "a" => TrackKey::A,
            "a#" | "bb" => TrackKey::ASharp,
            "b" | "cb" => TrackKey::B,
            _ => TrackKey::Unknown,
        }
    }

    /// Whether this key names the given reference pitch class.
    /// `Unknown` never matches anything.
    pub fn matches_pitch_class(&self, index: i32) -> bool {
        match self.pitch_class() {
            Some(pc) => i32::from(pc) == index,
            None => false,
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
