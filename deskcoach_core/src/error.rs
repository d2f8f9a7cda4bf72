//! Domain and build errors for the posture pipeline, plus a stable `GateReason`
//! enum used by the notification policy and the CLI's JSON telemetry.
use thiserror::Error;

/// Names the gate that suppressed a candidate nudge, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateReason {
    Cooldown,
    Snooze,
    ActiveNotification,
    Dedupe,
    BelowBackoffThreshold,
}

impl core::fmt::Display for GateReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GateReason::Cooldown => write!(f, "cooldown"),
            GateReason::Snooze => write!(f, "snooze"),
            GateReason::ActiveNotification => write!(f, "active_notification"),
            GateReason::Dedupe => write!(f, "dedupe"),
            GateReason::BelowBackoffThreshold => write!(f, "below_backoff_threshold"),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum PostureError {
    #[error("camera error: {0}")]
    Camera(String),
    #[error("pose estimator error: {0}")]
    Estimator(String),
    #[error("insufficient calibration samples: needed {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },
    #[error("calibration already in progress (pid {0})")]
    CalibrationInProgress(u32),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing pose source")]
    MissingPoseSource,
    #[error("missing notification sink")]
    MissingNotificationSink,
    #[error("missing storage root")]
    MissingStorageRoot,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

#[cfg(test)]
mod tests {
    use super::GateReason::*;

    #[test]
    fn gate_reason_display_is_stable() {
        assert_eq!(Cooldown.to_string(), "cooldown");
        assert_eq!(Snooze.to_string(), "snooze");
        assert_eq!(ActiveNotification.to_string(), "active_notification");
        assert_eq!(Dedupe.to_string(), "dedupe");
        assert_eq!(
            BelowBackoffThreshold.to_string(),
            "below_backoff_threshold"
        );
    }
}
