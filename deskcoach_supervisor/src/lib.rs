#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Process supervision (component I): start/stop/restart the background
//! daemon and guard a single calibration process, coordinating across
//! processes purely through pidfiles under the storage root.
pub mod error;
pub mod meta;
pub mod pidfile;
pub mod process;
pub mod supervisor;

pub use error::SupervisorError;
pub use meta::DaemonMeta;
pub use pidfile::PidRecord;
pub use supervisor::{CalibrationLockGuard, DaemonStatus, Supervisor};
