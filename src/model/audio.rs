use std::ops::Range;

/// Decoded PCM audio, one sample vector per channel
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel sample data (non-interleaved, f32 in -1.0..=1.0)
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a buffer from per-channel sample data
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Create a single-channel buffer
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![samples])
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames (the shortest channel wins if they disagree)
    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Average all channels over `range` into `out` (cleared first)
    pub fn mix_to_mono(&self, range: Range<usize>, out: &mut Vec<f32>) {
        out.clear();
        let end = range.end.min(self.frames());
        if range.start >= end {
            return;
        }

        match self.channels.as_slice() {
            [] => {}
            [only] => out.extend_from_slice(&only[range.start..end]),
            channels => {
                let count = channels.len() as f32;
                out.extend((range.start..end).map(|i| {
                    channels.iter().map(|c| c[i]).sum::<f32>() / count
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::mono(44100, vec![0.0; 22050]);
        assert_eq!(buffer.frames(), 22050);
        assert!((buffer.duration_secs() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stereo_mixdown() {
        let buffer = AudioBuffer::new(8000, vec![vec![1.0, 0.5, 0.0], vec![0.0, 0.5, -1.0]]);
        let mut out = Vec::new();
        buffer.mix_to_mono(0..3, &mut out);
        assert_eq!(out, vec![0.5, 0.5, -0.5]);

        buffer.mix_to_mono(2..10, &mut out);
        assert_eq!(out, vec![-0.5]);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = AudioBuffer::new(44100, Vec::new());
        assert!(buffer.is_empty());
        let mut out = vec![1.0];
        buffer.mix_to_mono(0..10, &mut out);
        assert!(out.is_empty());
    }
}
