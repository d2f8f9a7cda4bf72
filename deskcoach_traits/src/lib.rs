#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Traits that define the camera/notification/time abstractions used by the system.
//!
//! - `PoseSource` yields one landmark frame per call, or `None` on a frame with no
//!   confidently-detected subject.
//! - `NotificationSink` delivers a nudge without ever blocking on user interaction.
//! - `DndQuery` reports whether the OS's do-not-disturb mode is currently active.
//!
//! Other crates depend only on these traits, enabling simulation and multiple
//! camera/notification backends while keeping `deskcoach_core` platform-agnostic.
//! Timing is plain `f64` seconds passed by the caller (see `PoseLoop::step`),
//! not a trait object: the pipeline is step-driven, not self-clocking.

/// Number of landmarks produced per frame by the pose estimator (BlazePose/MediaPipe layout).
pub const LANDMARK_COUNT: usize = 33;

/// A single normalized keypoint: image coordinates in `[0, 1]` with origin top-left,
/// and a visibility score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub visibility: f32,
}

/// One captured frame's worth of landmarks, in estimator-defined order.
pub type LandmarkFrame = [Landmark; LANDMARK_COUNT];

/// A user action taken in response to a delivered notification (e.g. a button click),
/// fed back to the notification policy asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub id: String,
    pub label: String,
}

/// Source of landmark frames. Implementations wrap the camera session and the
/// external pose-landmark estimator; `deskcoach_core` never talks to either directly.
pub trait PoseSource {
    /// Capture and estimate one frame. `Ok(None)` means a frame was produced but no
    /// subject was detected (or confidence was too low); callers treat it as a
    /// paused sample, not an error. `Err` indicates a camera-level I/O failure.
    fn estimate(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<LandmarkFrame>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Delivery of user-facing nudges. Must return promptly: implementations hand the
/// notification to the OS and return, they never wait on the user dismissing it.
pub trait NotificationSink {
    /// Deliver a notification. Returns `Ok(true)` on success, `Ok(false)` on a
    /// non-fatal delivery failure (logged by the caller as `delivery_error`).
    fn notify(
        &mut self,
        title: &str,
        message: &str,
        actions: &[NotificationAction],
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// Query for the OS's do-not-disturb / focus state.
pub trait DndQuery {
    /// Query failure is treated by callers as DND-off; see `Err` handling at call sites.
    fn is_dnd_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

// Allow boxed trait objects to be used where a generic P: PoseSource / N: NotificationSink
// / D: DndQuery is expected.
impl<T: ?Sized + PoseSource> PoseSource for Box<T> {
    fn estimate(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<LandmarkFrame>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).estimate(timeout)
    }
}

impl<T: ?Sized + NotificationSink> NotificationSink for Box<T> {
    fn notify(
        &mut self,
        title: &str,
        message: &str,
        actions: &[NotificationAction],
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).notify(title, message, actions)
    }
}

impl<T: ?Sized + DndQuery> DndQuery for Box<T> {
    fn is_dnd_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).is_dnd_active()
    }
}
