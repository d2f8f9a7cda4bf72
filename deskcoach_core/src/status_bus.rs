//! Component G: the status bus. Two atomic-write publishers — live status at
//! ≤1 Hz and calibration progress at ≤4 Hz — that never abort the producer
//! on I/O failure.
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::calibration::CalibrationProgress;
use crate::policy::PolicyStatus;
use crate::state_machine::{Channel, DetectionPath, EffectiveThresholds, PostureState};
use crate::windows::WindowStats;
use crate::util::write_atomic;

/// `status.json` contents (§4.G): current state, time-in-state, confidence,
/// effective thresholds, per-channel window stats, detection path, active
/// preset, and compact policy timers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub ts: f64,
    pub state: PostureState,
    pub time_in_state_sec: f64,
    pub confidence: f32,
    pub effective: EffectiveThresholds,
    pub neck_window: WindowStats,
    pub torso_window: WindowStats,
    pub lateral_window: WindowStats,
    pub last_channel: Option<Channel>,
    pub last_path: Option<DetectionPath>,
    pub preset: deskcoach_config::SensitivityPreset,
    pub policy: PolicyStatus,
}

/// Drives one atomic-write publisher at a bounded cadence, swallowing I/O
/// errors with a short backoff rather than aborting the caller.
pub struct Publisher {
    path: PathBuf,
    min_interval: Duration,
    last_write: Option<Instant>,
    backoff_until: Option<Instant>,
}

impl Publisher {
    pub fn new(path: PathBuf, max_hz: f64) -> Self {
        Self {
            path,
            min_interval: Duration::from_secs_f64(1.0 / max_hz.max(0.1)),
            last_write: None,
            backoff_until: None,
        }
    }

    /// Publish `snapshot` if the cadence and backoff windows allow it.
    /// Returns true if a write was attempted.
    pub fn publish<T: Serialize>(&mut self, snapshot: &T) -> bool {
        let now = Instant::now();
        if let Some(until) = self.backoff_until {
            if now < until {
                return false;
            }
        }
        if let Some(last) = self.last_write {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }

        match serde_json::to_vec(snapshot) {
            Ok(bytes) => match write_atomic(&self.path, &bytes) {
                Ok(()) => {
                    self.last_write = Some(now);
                    self.backoff_until = None;
                }
                Err(e) => {
                    tracing::warn!(?e, path = %self.path.display(), "status publish failed, backing off");
                    self.backoff_until = Some(now + Duration::from_millis(250));
                }
            },
            Err(e) => {
                tracing::warn!(?e, "status snapshot serialization failed");
            }
        }
        true
    }
}

pub struct StatusBus {
    pub status: Publisher,
    pub calibration: Publisher,
}

impl StatusBus {
    pub fn new(status_path: PathBuf, calibration_path: PathBuf) -> Self {
        Self {
            status: Publisher::new(status_path, 1.0),
            calibration: Publisher::new(calibration_path, 4.0),
        }
    }

    pub fn publish_status(&mut self, snapshot: &StatusSnapshot) {
        self.status.publish(snapshot);
    }

    pub fn publish_calibration(&mut self, progress: &CalibrationProgress) {
        self.calibration.publish(progress);
    }
}
