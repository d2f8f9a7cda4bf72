#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Hardware-agnostic posture pipeline: geometry, calibration, condition
//! windows, the posture state machine, the notification policy, the pose
//! loop that drives them, and the status/event publishers.
//!
//! All camera/notification/DND interaction goes through
//! `deskcoach_traits::{PoseSource, NotificationSink, DndQuery}`; this crate
//! never talks to hardware or the OS directly.
//!
//! ## Architecture
//!
//! - **Metrics** (`metrics`): landmark geometry, EMA smoothing, rolling history.
//! - **Calibration** (`calibration`): baseline capture state machine.
//! - **Condition windows** (`windows`): rolling majority/cumulative/gap stats.
//! - **State machine** (`state_machine`): GOOD/SLOUCH/FORWARD_LEAN/LATERAL_LEAN/PAUSED.
//! - **Notification policy** (`policy`): cooldown/snooze/dedupe/backoff gating, DND queue.
//! - **Pose loop** (`pose_loop`): acquisition, pacing, governor, frame skip, dispatch.
//! - **Status bus** (`status_bus`): atomic-write publishers for live/calibration status.
//! - **Event log** (`event_log`): append-only `events.jsonl`.

pub mod calibration;
pub mod error;
pub mod event_log;
pub mod metrics;
pub mod policy;
pub mod pose_loop;
pub mod state_machine;
pub mod status_bus;
pub mod util;
pub mod windows;

pub use calibration::{Baseline, CalibrationProgress, CalibrationRoutine};
pub use error::{BuildError, GateReason, PostureError, Result};
pub use policy::{Decision, NotificationPolicy, NudgeCandidate, PolicyStatus};
pub use pose_loop::{PoseLoop, StepOutcome};
pub use state_machine::{Channel, PostureState, StateMachine, Transition};
