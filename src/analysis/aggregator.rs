//! Frame aggregation and one-shot finalization

use super::stats::{RunningMean, TempoHistogram};
use crate::model::{FrameFeatures, LocalAnalysisResult, TrackKey};

/// Folds the frame stream into a single [`LocalAnalysisResult`]
///
/// Only aggregate state is kept; individual frames are dropped after
/// [`Aggregator::push`].
#[derive(Debug, Default)]
pub struct Aggregator {
    tempo: TempoHistogram,
    loudness: RunningMean,
    rms: RunningMean,
    frames: usize,
    finalized: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one frame. Returns `false` (and ignores the frame) once the
    /// aggregator has been finalized.
    pub fn push(&mut self, frame: FrameFeatures) -> bool {
        if self.finalized {
            log::warn!("Frame {} arrived after finalization, ignored", frame.index);
            return false;
        }

        self.frames += 1;
        if let Some(bpm) = frame.tempo.filter(|bpm| *bpm > 0.0) {
            self.tempo.add(bpm);
        }
        if let Some(loudness) = frame.loudness {
            self.loudness.add(loudness);
        }
        if let Some(rms) = frame.rms {
            self.rms.add(rms.clamp(0.0, 1.0));
        }
        true
    }

    /// Frames consumed so far
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Whether no frame carried any signal. Digital silence (RMS of 0, no
    /// loudness) counts as empty.
    pub fn is_empty_signal(&self) -> bool {
        self.tempo.is_empty() && self.loudness.count() == 0 && self.rms.mean() == 0.0
    }

    /// End of stream. Produces the result on the first call and `None` on
    /// every later call.
    pub fn finish(&mut self, key: TrackKey) -> Option<LocalAnalysisResult> {
        if self.finalized {
            log::debug!("Duplicate end-of-stream ignored");
            return None;
        }
        self.finalized = true;

        if self.is_empty_signal() {
            log::warn!(
                "No valid measurements in {} frame(s), reporting a zeroed result",
                self.frames
            );
            return Some(LocalAnalysisResult::silent(key));
        }

        let bpm = self.tempo.mode().unwrap_or(0) as f32;
        let result =
            LocalAnalysisResult::from_parts(bpm, self.loudness.mean(), self.rms.mean(), key);

        log::debug!(
            "Aggregated {} frames: {} tempo candidates, {} loudness, {} rms samples",
            self.frames,
            self.tempo.len(),
            self.loudness.count(),
            self.rms.count()
        );

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize, tempo: Option<f32>, loudness: Option<f32>, rms: Option<f32>) -> FrameFeatures {
        FrameFeatures {
            index,
            tempo,
            loudness,
            rms,
        }
    }

    #[test]
    fn test_aggregates_mode_and_means() {
        let mut agg = Aggregator::new();
        let tempos = [120.2, 119.8, 118.0, 120.0, 117.9];
        let rms = [0.2, 0.4, 0.6, 0.4, 0.4];
        for (i, (&t, &r)) in tempos.iter().zip(rms.iter()).enumerate() {
            agg.push(frame(i, Some(t), Some(-6.0), Some(r)));
        }

        let result = agg.finish(TrackKey::Unknown).unwrap();
        assert_eq!(result.bpm(), 120.0);
        assert!((result.loudness() + 6.0).abs() < 1e-6);
        assert!((result.rms() - 0.4).abs() < 1e-6);
        assert_eq!(result.key(), TrackKey::Unknown);
    }

    #[test]
    fn test_frames_without_candidates_contribute_nothing() {
        let mut agg = Aggregator::new();
        agg.push(frame(0, None, None, Some(0.5)));
        agg.push(frame(1, Some(-3.0), None, None));
        agg.push(FrameFeatures::empty(2));

        let result = agg.finish(TrackKey::Unknown).unwrap();
        assert_eq!(result.bpm(), 0.0);
        assert_eq!(result.loudness(), 0.0);
        assert_eq!(result.rms(), 0.5);
        assert_eq!(agg.frame_count(), 3);
    }

    #[test]
    fn test_empty_signal_is_zeroed() {
        let mut agg = Aggregator::new();
        let result = agg.finish(TrackKey::Unknown).unwrap();
        assert_eq!(result, LocalAnalysisResult::silent(TrackKey::Unknown));
    }

    #[test]
    fn test_digital_silence_is_empty_signal() {
        let mut agg = Aggregator::new();
        for i in 0..4 {
            agg.push(frame(i, None, None, Some(0.0)));
        }

        assert!(agg.is_empty_signal());
        let result = agg.finish(TrackKey::Unknown).unwrap();
        assert_eq!(result, LocalAnalysisResult::silent(TrackKey::Unknown));
    }

    #[test]
    fn test_quiet_but_nonzero_signal_is_measured() {
        let mut agg = Aggregator::new();
        agg.push(frame(0, None, None, Some(0.0)));
        agg.push(frame(1, None, Some(-60.0), Some(0.001)));

        assert!(!agg.is_empty_signal());
        let result = agg.finish(TrackKey::Unknown).unwrap();
        assert_eq!(result.loudness(), -60.0);
        assert!((result.rms() - 0.0005).abs() < 1e-7);
    }

    #[test]
    fn test_finalizes_exactly_once() {
        let mut agg = Aggregator::new();
        agg.push(frame(0, Some(100.0), Some(-10.0), Some(0.1)));

        assert!(agg.finish(TrackKey::Unknown).is_some());
        assert!(agg.finish(TrackKey::Unknown).is_none());
        assert!(!agg.push(frame(1, Some(140.0), None, None)));
        assert!(agg.finish(TrackKey::Unknown).is_none());
        assert_eq!(agg.frame_count(), 1);
    }
}
