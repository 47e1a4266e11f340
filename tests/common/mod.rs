//! Synthetic audio fixtures shared by the integration tests

use std::path::{Path, PathBuf};

/// Encode channels as a 16-bit PCM WAV file
pub fn wav_bytes(sample_rate: u32, channels: &[Vec<f32>]) -> Vec<u8> {
    let channel_count = channels.len() as u16;
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let data_len = frames * channel_count as usize * 2;

    let mut out = Vec::with_capacity(44 + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channel_count.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * u32::from(channel_count) * 2).to_le_bytes());
    out.extend_from_slice(&(channel_count * 2).to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    for i in 0..frames {
        for channel in channels {
            let sample = (channel[i].clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }
    out
}

/// Short decaying 1 kHz bursts on every beat, silence in between
pub fn click_track(sample_rate: u32, bpm: f32, seconds: f32) -> Vec<f32> {
    let total = (sample_rate as f32 * seconds) as usize;
    let beat = (60.0 / bpm * sample_rate as f32).round() as usize;
    let mut samples = vec![0.0f32; total];
    for start in (0..total).step_by(beat) {
        for i in 0..400.min(total - start) {
            let t = i as f32 / sample_rate as f32;
            samples[start + i] = 0.8
                * (-(i as f32) / 60.0).exp()
                * (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
        }
    }
    samples
}

/// Write a WAV fixture into `dir` and return its path
pub fn write_wav(dir: &Path, name: &str, sample_rate: u32, channels: &[Vec<f32>]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, wav_bytes(sample_rate, channels)).expect("Failed to write WAV fixture");
    path
}
