//! `PoseSource` implementations: a scripted/simulated source for tests and
//! dry runs, and the scaffolding a real camera + landmark estimator backend
//! would fill in behind the same trait.
use std::collections::VecDeque;
use std::time::Duration;

use deskcoach_traits::{LandmarkFrame, PoseSource};

use crate::error::PlatformError;

/// Replays a fixed, pre-recorded sequence of frames. `None` entries simulate
/// a frame with no confidently-detected subject; exhausting the script
/// repeats the last entry (or yields `None` forever if the script was empty).
///
/// Used by integration tests and by `deskcoach_cli`'s dry-run mode, where a
/// real camera isn't available.
pub struct SimulatedPoseSource {
    frames: VecDeque<Option<LandmarkFrame>>,
    last: Option<LandmarkFrame>,
    /// If set, `estimate` returns `Err` on exactly these 1-based call indices,
    /// to exercise the pose loop's acquisition backoff/degradation path.
    fail_on_calls: Vec<u64>,
    calls: u64,
}

impl SimulatedPoseSource {
    pub fn new(frames: Vec<Option<LandmarkFrame>>) -> Self {
        Self {
            frames: frames.into(),
            last: None,
            fail_on_calls: Vec::new(),
            calls: 0,
        }
    }

    /// Inject transient read failures at the given 1-based call indices.
    pub fn with_failures(mut self, fail_on_calls: Vec<u64>) -> Self {
        self.fail_on_calls = fail_on_calls;
        self
    }
}

impl PoseSource for SimulatedPoseSource {
    fn estimate(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<LandmarkFrame>, Box<dyn std::error::Error + Send + Sync>> {
        self.calls += 1;
        if self.fail_on_calls.contains(&self.calls) {
            return Err(Box::new(PlatformError::CameraRead(format!(
                "simulated transient failure on call {}",
                self.calls
            ))));
        }
        match self.frames.pop_front() {
            Some(frame) => {
                self.last = frame;
                Ok(frame)
            }
            None => Ok(self.last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskcoach_traits::Landmark;

    fn frame() -> LandmarkFrame {
        [Landmark { x: 0.5, y: 0.5, visibility: 0.9 }; deskcoach_traits::LANDMARK_COUNT]
    }

    #[test]
    fn replays_scripted_frames_then_holds_last() {
        let mut source = SimulatedPoseSource::new(vec![Some(frame()), None]);
        assert!(source.estimate(Duration::ZERO).unwrap().is_some());
        assert!(source.estimate(Duration::ZERO).unwrap().is_none());
        assert!(source.estimate(Duration::ZERO).unwrap().is_none());
    }

    #[test]
    fn injected_failures_surface_on_their_call_index() {
        let mut source = SimulatedPoseSource::new(vec![Some(frame()); 5]).with_failures(vec![2]);
        assert!(source.estimate(Duration::ZERO).is_ok());
        assert!(source.estimate(Duration::ZERO).is_err());
        assert!(source.estimate(Duration::ZERO).is_ok());
    }
}
