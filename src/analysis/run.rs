//! Per-run state machine
//!
//! `Idle -> Analyzing -> {Finalized | Aborted}`. Frames are only accepted
//! while `Analyzing`; both end states are terminal.

use super::aggregator::Aggregator;
use super::cancel::CancellationToken;
use crate::error::{AnalysisError, Result};
use crate::model::{FrameFeatures, LocalAnalysisResult, TrackKey};
use serde::Serialize;

/// Lifecycle of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Analyzing,
    Finalized,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Finalized | RunState::Aborted)
    }

    fn can_transition_to(&self, to: RunState) -> bool {
        matches!(
            (self, to),
            (RunState::Idle, RunState::Analyzing)
                | (RunState::Idle, RunState::Aborted)
                | (RunState::Analyzing, RunState::Finalized)
                | (RunState::Analyzing, RunState::Aborted)
        )
    }
}

/// One analysis run: state, aggregate and the caller's cancellation token
#[derive(Debug)]
pub struct AnalysisRun {
    state: RunState,
    aggregator: Aggregator,
    token: CancellationToken,
}

impl AnalysisRun {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            state: RunState::Idle,
            aggregator: Aggregator::new(),
            token,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Frames accepted so far
    pub fn frame_count(&self) -> usize {
        self.aggregator.frame_count()
    }

    fn transition(&mut self, to: RunState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(AnalysisError::InvalidState {
                from: self.state,
                to,
            });
        }
        log::trace!("Run state {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// `Idle -> Analyzing`
    pub fn start(&mut self) -> Result<()> {
        if let Err(e) = self.token.check() {
            self.abort();
            return Err(e);
        }
        self.transition(RunState::Analyzing)
    }

    /// Hand one frame to the aggregator. Checks the cancellation token first;
    /// a revoked token aborts the run.
    pub fn push_frame(&mut self, frame: FrameFeatures) -> Result<()> {
        if self.state != RunState::Analyzing {
            return Err(AnalysisError::InvalidState {
                from: self.state,
                to: RunState::Analyzing,
            });
        }
        if let Err(e) = self.token.check() {
            self.abort();
            return Err(e);
        }
        self.aggregator.push(frame);
        Ok(())
    }

    /// End-of-stream signal. The first signal while `Analyzing` finalizes
    /// and returns the result; any later signal is a no-op returning `None`.
    /// A revoked token aborts instead of finalizing.
    pub fn end_of_stream(&mut self, key: TrackKey) -> Option<LocalAnalysisResult> {
        if self.state != RunState::Analyzing {
            log::debug!("End of stream in state {:?} ignored", self.state);
            return None;
        }
        if self.token.is_cancelled() {
            self.abort();
            return None;
        }

        let result = self.aggregator.finish(key)?;
        self.state = RunState::Finalized;
        Some(result)
    }

    /// Move to `Aborted` from any non-terminal state. Aggregated data is
    /// discarded; calling this on a terminal run does nothing.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        log::debug!(
            "Aborting run after {} frame(s)",
            self.aggregator.frame_count()
        );
        self.aggregator = Aggregator::new();
        self.state = RunState::Aborted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize) -> FrameFeatures {
        FrameFeatures {
            index,
            tempo: Some(120.0),
            loudness: Some(-8.0),
            rms: Some(0.3),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut run = AnalysisRun::new(CancellationToken::new());
        assert_eq!(run.state(), RunState::Idle);

        run.start().unwrap();
        assert_eq!(run.state(), RunState::Analyzing);

        run.push_frame(frame(0)).unwrap();
        run.push_frame(frame(1)).unwrap();

        let result = run.end_of_stream(TrackKey::Unknown).unwrap();
        assert_eq!(result.bpm(), 120.0);
        assert_eq!(run.state(), RunState::Finalized);
    }

    #[test]
    fn test_duplicate_end_of_stream_is_noop() {
        let mut run = AnalysisRun::new(CancellationToken::new());
        run.start().unwrap();
        run.push_frame(frame(0)).unwrap();

        assert!(run.end_of_stream(TrackKey::Unknown).is_some());
        assert!(run.end_of_stream(TrackKey::Unknown).is_none());
        assert_eq!(run.state(), RunState::Finalized);
    }

    #[test]
    fn test_frames_rejected_outside_analyzing() {
        let mut run = AnalysisRun::new(CancellationToken::new());
        assert!(matches!(
            run.push_frame(frame(0)),
            Err(AnalysisError::InvalidState { from: RunState::Idle, .. })
        ));

        run.start().unwrap();
        run.end_of_stream(TrackKey::Unknown);
        assert!(run.push_frame(frame(1)).is_err());
        assert_eq!(run.frame_count(), 0);
    }

    #[test]
    fn test_cannot_restart() {
        let mut run = AnalysisRun::new(CancellationToken::new());
        run.start().unwrap();
        assert!(run.start().is_err());

        run.abort();
        assert!(run.start().is_err());
        assert_eq!(run.state(), RunState::Aborted);
    }

    #[test]
    fn test_cancel_mid_stream_aborts() {
        let token = CancellationToken::new();
        let mut run = AnalysisRun::new(token.clone());
        run.start().unwrap();
        run.push_frame(frame(0)).unwrap();

        token.cancel();
        assert!(matches!(
            run.push_frame(frame(1)),
            Err(AnalysisError::Cancelled)
        ));
        assert_eq!(run.state(), RunState::Aborted);
        assert!(run.end_of_stream(TrackKey::Unknown).is_none());
    }

    #[test]
    fn test_cancel_before_end_of_stream() {
        let token = CancellationToken::new();
        let mut run = AnalysisRun::new(token.clone());
        run.start().unwrap();
        run.push_frame(frame(0)).unwrap();

        token.cancel();
        assert!(run.end_of_stream(TrackKey::Unknown).is_none());
        assert_eq!(run.state(), RunState::Aborted);
    }

    #[test]
    fn test_cancel_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let mut run = AnalysisRun::new(token);
        assert!(matches!(run.start(), Err(AnalysisError::Cancelled)));
        assert_eq!(run.state(), RunState::Aborted);
    }
}
