//! Symphonia-backed decoder
//!
//! Decodes the whole stream into per-channel f32 buffers. Packets that fail
//! to decode are skipped; a stream that cannot be probed or yields no
//! samples at all is reported as a [`DecodeError`].

use super::traits::Decoder;
use crate::error::DecodeError;
use crate::model::AudioBuffer;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoder using symphonia's default format and codec registries
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    /// Stop decoding after this many seconds (None = whole stream)
    max_duration_secs: Option<u32>,
}

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only decode the first `secs` seconds of the stream
    pub fn with_max_duration(mut self, secs: u32) -> Self {
        self.max_duration_secs = Some(secs);
        self
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8], hint: Option<&str>) -> Result<AudioBuffer, DecodeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let mut probe_hint = Hint::new();
        if let Some(ext) = hint {
            probe_hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &probe_hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudio)?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| DecodeError::Corrupt("no sample rate in audio track".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let max_frames = self
            .max_duration_secs
            .map(|secs| sample_rate as usize * secs as usize);

        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(DecodeError::Corrupt(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Skipping undecodable packet: {}", e);
                    skipped_packets += 1;
                    continue;
                }
                Err(e) => return Err(DecodeError::Corrupt(e.to_string())),
            };

            let spec = *decoded.spec();
            let channel_count = spec.channels.count();
            if channel_count == 0 {
                continue;
            }
            if channels.is_empty() {
                channels = vec![Vec::new(); channel_count];
            }

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            // De-interleave; a mid-stream channel layout change folds extra
            // channels onto the last known one.
            for frame in sample_buf.samples().chunks(channel_count) {
                for (ch, &sample) in frame.iter().enumerate() {
                    let target = ch.min(channels.len() - 1);
                    channels[target].push(sample);
                }
            }

            if let Some(max) = max_frames {
                if channels[0].len() >= max {
                    for channel in &mut channels {
                        channel.truncate(max);
                    }
                    break;
                }
            }
        }

        let buffer = AudioBuffer::new(sample_rate, channels);
        if buffer.is_empty() {
            return Err(DecodeError::NoAudio);
        }

        log::debug!(
            "Decoded {} frames ({:.1}s) at {}Hz, {} channel(s), {} packet(s) skipped",
            buffer.frames(),
            buffer.duration_secs(),
            sample_rate,
            buffer.channel_count(),
            skipped_packets
        );

        Ok(buffer)
    }

    fn name(&self) -> &'static str {
        "symphonia"
    }
}
