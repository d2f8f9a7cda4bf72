#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
//! Platform adapters implementing `deskcoach_traits`' seams: a pose source
//! for tests and dry runs, notification sinks (dry-run recorder and, behind
//! `desktop-notify`, a real desktop notifier), and do-not-disturb queries.
//!
//! A real camera + landmark estimator backend (MediaPipe BlazePose or
//! similar) implements `PoseSource` the same way `SimulatedPoseSource` does
//! here; this crate only carries the simulated/null variants plus whatever
//! has a portable off-the-shelf crate behind it.

pub mod dnd;
pub mod error;
pub mod notify;
pub mod pose_source;

pub use dnd::{ManualDnd, NullDnd};
pub use error::PlatformError;
pub use notify::{DryRunNotifier, RecordedNotification};
pub use pose_source::SimulatedPoseSource;

#[cfg(feature = "desktop-notify")]
pub use notify::DesktopNotifier;
