//! Process liveness checks and graceful/forceful termination, via `sysinfo`.
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessesToUpdate, Signal, System};

/// Whether `pid` belongs to a live process.
pub fn is_alive(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]), true);
    sys.process(Pid::from_u32(pid)).is_some()
}

/// Whether `pid` belongs to a live process whose executable name contains
/// `exe_hint`. Used to detect a PID reused by an unrelated process (§4.I).
pub fn is_alive_named(pid: u32, exe_hint: &str) -> bool {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]), true);
    match sys.process(Pid::from_u32(pid)) {
        Some(process) => process
            .name()
            .to_string_lossy()
            .to_ascii_lowercase()
            .contains(&exe_hint.to_ascii_lowercase()),
        None => false,
    }
}

/// Send a graceful termination signal and wait up to `graceful_window` for
/// the process to exit; escalate to a forceful kill otherwise (§5). Returns
/// true once the process is confirmed gone.
pub fn terminate(pid: u32, graceful_window: Duration) -> bool {
    let target = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    let Some(process) = sys.process(target) else {
        return true;
    };
    if process.kill_with(Signal::Term).unwrap_or(false) {
        tracing::info!(pid, "sent graceful termination signal");
    } else {
        process.kill();
        tracing::warn!(pid, "graceful signal unsupported, force-killed immediately");
    }

    let deadline = Instant::now() + graceful_window;
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(100));
        sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
        if sys.process(target).is_none() {
            return true;
        }
    }

    sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    let Some(process) = sys.process(target) else {
        return true;
    };
    tracing::warn!(pid, "graceful window elapsed, escalating to force-kill");
    process.kill();
    std::thread::sleep(Duration::from_millis(100));
    sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    sys.process(target).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bogus_pid_is_not_alive() {
        assert!(!is_alive(u32::MAX));
    }

    #[test]
    fn terminate_of_already_dead_pid_returns_true() {
        assert!(terminate(u32::MAX, Duration::from_millis(50)));
    }
}
