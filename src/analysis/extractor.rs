//! Streaming frame extractor
//!
//! Walks a decoded buffer in fixed-size, non-overlapping frames and yields
//! one [`FrameFeatures`] per frame:
//! - RMS of the mono mixdown, clamped to 0.0-1.0
//! - loudness in dBFS (absent for digital silence)
//! - a tempo candidate from the most recent inter-onset interval
//!
//! Onsets are found on smaller blocks inside each frame by comparing block
//! energy with a running mean of recent blocks. The onset position is
//! refined to the loudest sample of the block so that the interval is not
//! quantized to the block size.

use crate::config::ExtractionConfig;
use crate::model::{AudioBuffer, FrameFeatures};
use std::collections::VecDeque;

/// Energy floor added to the onset threshold so that near-silence never
/// triggers an onset
const ONSET_ENERGY_FLOOR: f32 = 1e-4;

/// Blocks of history required before onsets are reported
const MIN_HISTORY_BLOCKS: usize = 4;

/// Upper bound on the history slots reserved up front
const MAX_HISTORY_PREALLOC: usize = 1024;

/// Iterator over the frames of one buffer
pub struct FrameExtractor<'a> {
    buffer: &'a AudioBuffer,
    frame_size: usize,
    position: usize,
    index: usize,
    onsets: OnsetTracker,
    scratch: Vec<f32>,
}

impl<'a> FrameExtractor<'a> {
    pub fn new(buffer: &'a AudioBuffer, config: &ExtractionConfig) -> Self {
        let frame_size = config.effective_frame_size();
        Self {
            buffer,
            frame_size,
            position: 0,
            index: 0,
            onsets: OnsetTracker::new(config, buffer.sample_rate),
            // A frame never holds more than the whole buffer
            scratch: Vec::with_capacity(frame_size.min(buffer.frames())),
        }
    }

    /// Number of frames this extractor will yield in total
    pub fn frame_count(&self) -> usize {
        self.buffer.frames().div_ceil(self.frame_size)
    }
}

impl Iterator for FrameExtractor<'_> {
    type Item = FrameFeatures;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.buffer.frames();
        if self.position >= total {
            return None;
        }

        let start = self.position;
        let end = start.saturating_add(self.frame_size).min(total);
        self.buffer.mix_to_mono(start..end, &mut self.scratch);

        let rms = frame_rms(&self.scratch);
        let loudness = rms.and_then(loudness_dbfs);
        let tempo = self.onsets.process(&self.scratch, start);

        let features = FrameFeatures {
            index: self.index,
            tempo,
            loudness,
            rms,
        };

        self.position = end;
        self.index += 1;
        Some(features)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.frame_count() - self.index.min(self.frame_count());
        (remaining, Some(remaining))
    }
}

/// Root-mean-square amplitude clamped to 0.0-1.0; `None` for an empty frame
pub fn frame_rms(samples: &[f32]) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }
    let energy = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = energy.sqrt();
    rms.is_finite().then(|| rms.clamp(0.0, 1.0))
}

/// RMS expressed in dB relative to full scale; `None` for silence
pub fn loudness_dbfs(rms: f32) -> Option<f32> {
    (rms > 0.0).then(|| 20.0 * rms.log10())
}

/// Fold a BPM value into `[min, max]` by doubling or halving.
/// Returns `None` if it cannot be brought into range.
pub fn fold_bpm(bpm: f32, min: f32, max: f32) -> Option<f32> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return None;
    }

    let mut bpm = bpm;
    if min > 0.0 && max > min {
        while bpm < min && bpm * 2.0 <= max {
            bpm *= 2.0;
        }
        while bpm > max && bpm / 2.0 >= min {
            bpm /= 2.0;
        }
        if bpm < min || bpm > max {
            return None;
        }
    }
    Some(bpm)
}

/// Energy-based onset detector carried across frames
struct OnsetTracker {
    block_size: usize,
    sample_rate: u32,
    sensitivity: f32,
    min_gap_samples: usize,
    min_bpm: f32,
    max_bpm: f32,
    history: VecDeque<f32>,
    history_len: usize,
    previous_energy: f32,
    last_onset: Option<usize>,
}

impl OnsetTracker {
    fn new(config: &ExtractionConfig, sample_rate: u32) -> Self {
        let min_gap_samples =
            (config.min_onset_gap_ms.max(0.0) / 1000.0 * sample_rate as f32) as usize;
        let history_len = config.energy_history.max(1);
        Self {
            block_size: config.effective_onset_block(),
            sample_rate,
            sensitivity: config.onset_sensitivity,
            min_gap_samples,
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            history: VecDeque::with_capacity(history_len.min(MAX_HISTORY_PREALLOC)),
            history_len,
            previous_energy: 0.0,
            last_onset: None,
        }
    }

    /// Feed one frame starting at absolute sample `frame_start`; returns the
    /// tempo implied by the last onset interval completed in this frame.
    fn process(&mut self, frame: &[f32], frame_start: usize) -> Option<f32> {
        if self.sample_rate == 0 {
            return None;
        }

        let mut candidate = None;
        for (i, block) in frame.chunks(self.block_size).enumerate() {
            let block_start = frame_start + i * self.block_size;
            if let Some(bpm) = self.process_block(block, block_start) {
                candidate = Some(bpm);
            }
        }
        candidate
    }

    fn process_block(&mut self, block: &[f32], block_start: usize) -> Option<f32> {
        let energy = block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32;
        if !energy.is_finite() {
            return None;
        }

        let mean = if self.history.is_empty() {
            0.0
        } else {
            self.history.iter().sum::<f32>() / self.history.len() as f32
        };
        let threshold = mean * self.sensitivity + ONSET_ENERGY_FLOOR;

        let is_onset = self.history.len() >= MIN_HISTORY_BLOCKS
            && energy > threshold
            && energy > self.previous_energy;

        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(energy);
        self.previous_energy = energy;

        if !is_onset {
            return None;
        }

        let peak_offset = block
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |(best_i, best), (i, s)| {
                if s.abs() > best {
                    (i, s.abs())
                } else {
                    (best_i, best)
                }
            })
            .0;
        let onset = block_start + peak_offset;

        let candidate = match self.last_onset {
            Some(last) if onset.saturating_sub(last) < self.min_gap_samples => return None,
            Some(last) if onset > last => {
                let interval = (onset - last) as f32 / self.sample_rate as f32;
                fold_bpm(60.0 / interval, self.min_bpm, self.max_bpm)
            }
            _ => None,
        };

        log::trace!("Onset at sample {} (candidate {:?})", onset, candidate);
        self.last_onset = Some(onset);
        candidate
    }
}
