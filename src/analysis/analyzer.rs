//! Local analyzer: decode, extract, aggregate
//!
//! Drives one [`AnalysisRun`] per call. The decoded buffer is owned by the
//! call and dropped on every exit path, success or failure.

use super::cancel::CancellationToken;
use super::extractor::FrameExtractor;
use super::run::{AnalysisRun, RunState};
use super::stub::UnimplementedKeyDetector;
use super::traits::KeyDetector;
use crate::config::ExtractionConfig;
use crate::decode::{AudioSource, Decoder, EncodedAudio, SymphoniaDecoder};
use crate::error::{AnalysisError, Result};
use crate::model::LocalAnalysisResult;

/// Local feature analyzer
pub struct LocalAnalyzer<D: Decoder = SymphoniaDecoder, K: KeyDetector = UnimplementedKeyDetector> {
    decoder: D,
    key_detector: K,
    config: ExtractionConfig,
}

impl LocalAnalyzer {
    /// Analyzer with the symphonia decoder and default settings
    pub fn new() -> Self {
        Self::with_decoder(SymphoniaDecoder::new())
    }
}

impl Default for LocalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Decoder> LocalAnalyzer<D, UnimplementedKeyDetector> {
    pub fn with_decoder(decoder: D) -> Self {
        Self {
            decoder,
            key_detector: UnimplementedKeyDetector::new(),
            config: ExtractionConfig::default(),
        }
    }
}

impl<D: Decoder, K: KeyDetector> LocalAnalyzer<D, K> {
    /// Replace the key detection backend
    pub fn with_key_detector<K2: KeyDetector>(self, key_detector: K2) -> LocalAnalyzer<D, K2> {
        LocalAnalyzer {
            decoder: self.decoder,
            key_detector,
            config: self.config,
        }
    }

    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Analyze encoded bytes.
    ///
    /// `on_complete` is invoked exactly once with the outcome, success or
    /// error, unless the token was revoked: a cancelled run reports nothing
    /// through the callback and returns `Err(Cancelled)`.
    pub fn analyze<F>(
        &self,
        audio: &EncodedAudio,
        token: &CancellationToken,
        on_complete: F,
    ) -> Result<LocalAnalysisResult>
    where
        F: FnOnce(&Result<LocalAnalysisResult>),
    {
        let mut run = AnalysisRun::new(token.clone());
        let outcome = run.start().and_then(|_| self.drive(&mut run, audio));

        if outcome.is_err() {
            run.abort();
        }

        Self::deliver(&run, token, outcome, on_complete)
    }

    /// Final token check, then the single completion callback
    fn deliver<F>(
        run: &AnalysisRun,
        token: &CancellationToken,
        outcome: Result<LocalAnalysisResult>,
        on_complete: F,
    ) -> Result<LocalAnalysisResult>
    where
        F: FnOnce(&Result<LocalAnalysisResult>),
    {
        if token.is_cancelled() {
            if run.state() == RunState::Finalized {
                // Finalized is terminal, so the run cannot move to Aborted
                log::debug!("Run finalized before cancellation was seen, result withheld");
            } else {
                log::debug!("Run cancelled in state {:?}, result withheld", run.state());
            }
            return Err(AnalysisError::Cancelled);
        }

        match &outcome {
            Ok(result) => log::info!(
                "Local analysis: BPM={:.0}, loudness={:.2} dB, RMS={:.3}, key={}",
                result.bpm(),
                result.loudness(),
                result.rms(),
                result.key()
            ),
            Err(e) => log::warn!("Local analysis failed: {}", e),
        }

        on_complete(&outcome);
        outcome
    }

    /// Read the source, then analyze it. A read failure is reported through
    /// `on_complete` like any other error.
    pub fn analyze_source<F>(
        &self,
        source: &AudioSource,
        token: &CancellationToken,
        on_complete: F,
    ) -> Result<LocalAnalysisResult>
    where
        F: FnOnce(&Result<LocalAnalysisResult>),
    {
        token.check()?;
        log::debug!("Reading audio from {}", source);

        match source.read() {
            Ok(audio) => self.analyze(&audio, token, on_complete),
            Err(e) => {
                if token.is_cancelled() {
                    return Err(AnalysisError::Cancelled);
                }
                let outcome = Err(AnalysisError::from(e));
                log::warn!("Could not read {}", source);
                on_complete(&outcome);
                outcome
            }
        }
    }

    /// One pass over the stream. Any error leaves the run for the caller to abort.
    fn drive(&self, run: &mut AnalysisRun, audio: &EncodedAudio) -> Result<LocalAnalysisResult> {
        let buffer = self
            .decoder
            .decode(&audio.bytes, audio.extension.as_deref())?;

        log::debug!(
            "Analyzing {:.1}s of audio with {} decoder, frame size {}",
            buffer.duration_secs(),
            self.decoder.name(),
            self.config.frame_size
        );

        let key = self.key_detector.detect(&buffer);

        for frame in FrameExtractor::new(&buffer, &self.config) {
            run.push_frame(frame)?;
        }

        run.end_of_stream(key).ok_or(AnalysisError::InvalidState {
            from: run.state(),
            to: RunState::Finalized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::model::{AudioBuffer, TrackKey};
    use std::cell::{Cell, RefCell};

    /// Decoder that hands back a fixed buffer, or fails
    struct FixedDecoder(Option<AudioBuffer>);

    impl Decoder for FixedDecoder {
        fn decode(&self, _bytes: &[u8], _hint: Option<&str>) -> std::result::Result<AudioBuffer, DecodeError> {
            self.0.clone().ok_or(DecodeError::Corrupt("test".to_string()))
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FixedKey(TrackKey);

    impl KeyDetector for FixedKey {
        fn detect(&self, _buffer: &AudioBuffer) -> TrackKey {
            self.0
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    /// Decoder that revokes the run's token while decoding
    struct CancellingDecoder {
        token: CancellationToken,
        buffer: AudioBuffer,
    }

    impl Decoder for CancellingDecoder {
        fn decode(&self, _bytes: &[u8], _hint: Option<&str>) -> std::result::Result<AudioBuffer, DecodeError> {
            self.token.cancel();
            Ok(self.buffer.clone())
        }

        fn name(&self) -> &'static str {
            "cancelling"
        }
    }

    fn encoded() -> EncodedAudio {
        EncodedAudio {
            bytes: vec![0; 16],
            extension: None,
        }
    }

    #[test]
    fn test_success_invokes_callback_once() {
        let analyzer = LocalAnalyzer::with_decoder(FixedDecoder(Some(AudioBuffer::mono(
            8000,
            vec![0.5; 8192],
        ))));
        let calls = Cell::new(0);

        let result = analyzer
            .analyze(&encoded(), &CancellationToken::new(), |outcome| {
                calls.set(calls.get() + 1);
                assert!(outcome.is_ok());
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert!((result.rms() - 0.5).abs() < 1e-6);
        assert_eq!(result.key(), TrackKey::Unknown);
    }

    #[test]
    fn test_decode_error_reported_once() {
        let analyzer = LocalAnalyzer::with_decoder(FixedDecoder(None));
        let seen = RefCell::new(Vec::new());

        let result = analyzer.analyze(&encoded(), &CancellationToken::new(), |outcome| {
            seen.borrow_mut().push(matches!(outcome, Err(AnalysisError::Decode(_))));
        });

        assert!(matches!(result, Err(AnalysisError::Decode(_))));
        assert_eq!(*seen.borrow(), vec![true]);
    }

    #[test]
    fn test_cancelled_run_skips_callback() {
        let analyzer = LocalAnalyzer::with_decoder(FixedDecoder(Some(AudioBuffer::mono(
            8000,
            vec![0.5; 8192],
        ))));
        let token = CancellationToken::new();
        token.cancel();

        let result = analyzer.analyze(&encoded(), &token, |_| panic!("callback after cancel"));
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[test]
    fn test_cancel_during_run_stops_frames() {
        let token = CancellationToken::new();
        let analyzer = LocalAnalyzer::with_decoder(CancellingDecoder {
            token: token.clone(),
            buffer: AudioBuffer::mono(8000, vec![0.5; 8192]),
        });
        let calls = Cell::new(0);

        let result = analyzer.analyze(&encoded(), &token, |_| calls.set(calls.get() + 1));

        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_cancel_after_finalize_withholds_result() {
        let token = CancellationToken::new();
        let mut run = AnalysisRun::new(token.clone());
        run.start().unwrap();
        run.push_frame(crate::model::FrameFeatures {
            index: 0,
            tempo: Some(120.0),
            loudness: Some(-6.0),
            rms: Some(0.5),
        })
        .unwrap();
        let result = run.end_of_stream(TrackKey::Unknown).unwrap();
        token.cancel();

        type Analyzer = LocalAnalyzer<FixedDecoder, UnimplementedKeyDetector>;
        let delivered = Analyzer::deliver(&run, &token, Ok(result), |_| {
            panic!("callback after cancel")
        });

        assert!(matches!(delivered, Err(AnalysisError::Cancelled)));
        assert_eq!(run.state(), RunState::Finalized);
    }

    #[test]
    fn test_key_detector_is_used() {
        let analyzer = LocalAnalyzer::with_decoder(FixedDecoder(Some(AudioBuffer::mono(
            8000,
            vec![0.1; 4096],
        ))))
        .with_key_detector(FixedKey(TrackKey::G));

        let result = analyzer
            .analyze(&encoded(), &CancellationToken::new(), |_| {})
            .unwrap();
        assert_eq!(result.key(), TrackKey::G);
    }

    #[test]
    fn test_silent_buffer_degrades_to_zero() {
        let analyzer = LocalAnalyzer::with_decoder(FixedDecoder(Some(AudioBuffer::mono(
            8000,
            vec![0.0; 8192],
        ))));
        let result = analyzer
            .analyze(&encoded(), &CancellationToken::new(), |_| {})
            .unwrap();
        assert_eq!(result.bpm(), 0.0);
        assert_eq!(result.loudness(), 0.0);
        assert_eq!(result.rms(), 0.0);
    }
}
