//! Start/stop/restart orchestration and the calibration single-instance
//! lock (§4.I).
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use deskcoach_config::StorageRoot;

use crate::error::SupervisorError;
use crate::meta::DaemonMeta;
use crate::pidfile::PidRecord;
use crate::process;

const GRACEFUL_WINDOW: Duration = Duration::from_secs(5);
/// Substring expected in a live daemon pidfile's process-table entry; a PID
/// that has been recycled by an unrelated process won't match it.
const DAEMON_EXE_HINT: &str = "deskcoach";

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    Running(u32),
    NotRunning,
}

/// Coordinates at most one background daemon and at most one calibration
/// process, scoped to a single storage root.
pub struct Supervisor {
    root: StorageRoot,
}

impl Supervisor {
    pub fn new(root: StorageRoot) -> Self {
        Self { root }
    }

    /// Current daemon status, reclaiming a stale pidfile if found.
    pub fn daemon_status(&self) -> Result<DaemonStatus, SupervisorError> {
        let path = self.root.daemon_pid();
        match PidRecord::read(&path)? {
            Some(record) if process::is_alive_named(record.pid, DAEMON_EXE_HINT) => {
                Ok(DaemonStatus::Running(record.pid))
            }
            Some(stale) => {
                tracing::warn!(pid = stale.pid, "reclaiming stale daemon pidfile");
                PidRecord::remove(&path)?;
                Ok(DaemonStatus::NotRunning)
            }
            None => Ok(DaemonStatus::NotRunning),
        }
    }

    /// Idempotent: a live daemon already running returns its existing PID
    /// without spawning a new one and leaves the pidfile unchanged.
    pub fn start_daemon(&self, exe: &Path, args: &[String]) -> Result<u32, SupervisorError> {
        if let DaemonStatus::Running(pid) = self.daemon_status()? {
            return Ok(pid);
        }
        self.root.ensure_exists().map_err(SupervisorError::PidFile)?;

        let mut command = Command::new(exe);
        command.args(args);
        command.env("STORAGE_ROOT", self.root.root());

        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.daemon_log())
            .map_err(SupervisorError::PidFile)?;
        command.stdout(log_file.try_clone().map_err(SupervisorError::PidFile)?);
        command.stderr(log_file);

        let child = command.spawn().map_err(SupervisorError::Spawn)?;
        let pid = child.id();
        // The supervisor tracks lifecycle through the pidfile across process
        // boundaries (including its own restart), not through this Child
        // handle, which would otherwise reap-on-drop if held.
        std::mem::forget(child);

        let record = PidRecord {
            pid,
            started_at: now_unix(),
            cmdline: format!("{} {}", exe.display(), args.join(" ")),
        };
        record.write(&self.root.daemon_pid())?;
        DaemonMeta { args: args.to_vec() }.write(&self.root.daemon_meta_json())?;
        Ok(pid)
    }

    /// Graceful termination with a 5s window, escalating to force-kill; a
    /// no-op success if nothing is running.
    pub fn stop_daemon(&self) -> Result<(), SupervisorError> {
        let path = self.root.daemon_pid();
        let Some(record) = PidRecord::read(&path)? else {
            return Ok(());
        };
        if process::is_alive(record.pid) && !process::terminate(record.pid, GRACEFUL_WINDOW) {
            return Err(SupervisorError::GracefulTimeout);
        }
        PidRecord::remove(&path)
    }

    /// Stop, a short delay, then start again with the last-known args from
    /// the companion metadata file.
    pub fn restart_daemon(&self, exe: &Path) -> Result<u32, SupervisorError> {
        self.stop_daemon()?;
        std::thread::sleep(Duration::from_millis(200));
        let meta = DaemonMeta::read(&self.root.daemon_meta_json())?.unwrap_or_default();
        self.start_daemon(exe, &meta.args)
    }

    /// Acquire the single-instance calibration lock, reclaiming it if the
    /// PID it names is no longer alive.
    pub fn acquire_calibration_lock(&self) -> Result<CalibrationLockGuard, SupervisorError> {
        self.root.ensure_exists().map_err(SupervisorError::PidFile)?;
        let path = self.root.calibration_lock();
        if let Some(existing) = PidRecord::read(&path)? {
            if process::is_alive_named(existing.pid, DAEMON_EXE_HINT) {
                return Err(SupervisorError::CalibrationAlreadyRunning(existing.pid));
            }
            tracing::warn!(pid = existing.pid, "reclaiming stale calibration lock");
        }
        let record = PidRecord {
            pid: std::process::id(),
            started_at: now_unix(),
            cmdline: "calibrate".to_string(),
        };
        record.write(&path)?;
        Ok(CalibrationLockGuard { path })
    }
}

/// Releases the calibration lock on drop, so an early return or panic during
/// calibration never leaves a stale lock behind.
pub struct CalibrationLockGuard {
    path: PathBuf,
}

impl Drop for CalibrationLockGuard {
    fn drop(&mut self) {
        if let Err(e) = PidRecord::remove(&self.path) {
            tracing::warn!(?e, "failed to release calibration lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pidfile_is_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let sup = Supervisor::new(StorageRoot::new(dir.path()));
        assert_eq!(sup.daemon_status().unwrap(), DaemonStatus::NotRunning);
    }

    #[test]
    fn dead_pid_in_pidfile_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::new(dir.path());
        root.ensure_exists().unwrap();
        let record = PidRecord { pid: u32::MAX, started_at: 0.0, cmdline: "bogus".into() };
        record.write(&root.daemon_pid()).unwrap();
        let sup = Supervisor::new(root.clone());
        assert_eq!(sup.daemon_status().unwrap(), DaemonStatus::NotRunning);
        assert!(!root.daemon_pid().exists());
    }

    #[test]
    fn stop_with_no_pidfile_is_a_no_op_success() {
        let dir = tempfile::tempdir().unwrap();
        let sup = Supervisor::new(StorageRoot::new(dir.path()));
        sup.stop_daemon().unwrap();
    }

    #[test]
    fn calibration_lock_blocks_second_acquire_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let sup = Supervisor::new(StorageRoot::new(dir.path()));
        let guard = sup.acquire_calibration_lock().unwrap();
        let err = sup.acquire_calibration_lock().unwrap_err();
        assert!(matches!(err, SupervisorError::CalibrationAlreadyRunning(_)));
        drop(guard);
        sup.acquire_calibration_lock().unwrap();
    }
}
