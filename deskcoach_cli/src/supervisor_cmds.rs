//! `start`/`stop`/`restart`/`status`/`health`/`purge-events`: thin wrappers
//! over `deskcoach_supervisor::Supervisor` and the event log.
use deskcoach_config::StorageRoot;
use deskcoach_core::calibration::Baseline;
use deskcoach_core::event_log::EventLog;
use deskcoach_supervisor::{DaemonStatus, Supervisor};

use crate::cli::RunArgs;

fn current_exe() -> eyre::Result<std::path::PathBuf> {
    Ok(std::env::current_exe()?)
}

pub fn start(root: StorageRoot, run_args: &RunArgs, json: bool) -> eyre::Result<()> {
    let exe = current_exe()?;
    let sup = Supervisor::new(root);
    let args = run_args.to_args();
    let pid = sup.start_daemon(&exe, &args)?;
    if json {
        println!("{}", serde_json::json!({ "status": "running", "pid": pid }));
    } else {
        println!("deskcoach daemon running (pid {pid})");
    }
    Ok(())
}

pub fn stop(root: StorageRoot, json: bool) -> eyre::Result<()> {
    let sup = Supervisor::new(root);
    sup.stop_daemon()?;
    if json {
        println!("{}", serde_json::json!({ "status": "stopped" }));
    } else {
        println!("deskcoach daemon stopped");
    }
    Ok(())
}

pub fn restart(root: StorageRoot, json: bool) -> eyre::Result<()> {
    let exe = current_exe()?;
    let sup = Supervisor::new(root);
    let pid = sup.restart_daemon(&exe)?;
    if json {
        println!("{}", serde_json::json!({ "status": "running", "pid": pid }));
    } else {
        println!("deskcoach daemon restarted (pid {pid})");
    }
    Ok(())
}

pub fn status(root: StorageRoot, json: bool) -> eyre::Result<()> {
    let sup = Supervisor::new(root.clone());
    let daemon_status = sup.daemon_status()?;
    let status_snapshot = std::fs::read_to_string(root.status_json()).ok();

    if json {
        let pid = match daemon_status {
            DaemonStatus::Running(pid) => serde_json::json!(pid),
            DaemonStatus::NotRunning => serde_json::Value::Null,
        };
        println!(
            "{}",
            serde_json::json!({
                "running": matches!(daemon_status, DaemonStatus::Running(_)),
                "pid": pid,
                "last_status": status_snapshot.as_deref().and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok()),
            })
        );
        return Ok(());
    }

    match daemon_status {
        DaemonStatus::Running(pid) => println!("running (pid {pid})"),
        DaemonStatus::NotRunning => println!("not running"),
    }
    if let Some(snapshot) = status_snapshot {
        println!("last status: {snapshot}");
    }
    Ok(())
}

pub fn health(root: StorageRoot, json: bool) -> eyre::Result<()> {
    let writable = root.ensure_exists().is_ok();
    let calibrated = Baseline::load(&root.calibration_json()).is_ok();
    let sup = Supervisor::new(root.clone());
    let daemon_status = sup.daemon_status()?;
    let healthy = writable;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "healthy": healthy,
                "storage_writable": writable,
                "calibrated": calibrated,
                "daemon_running": matches!(daemon_status, DaemonStatus::Running(_)),
            })
        );
    } else {
        println!("storage writable: {writable}");
        println!("calibrated: {calibrated}");
        println!("daemon running: {}", matches!(daemon_status, DaemonStatus::Running(_)));
    }
    if !healthy {
        eyre::bail!("storage root is not writable");
    }
    Ok(())
}

pub fn purge_events(root: StorageRoot, json: bool) -> eyre::Result<()> {
    root.ensure_exists()?;
    let log = EventLog::spawn(root.events_jsonl(), 1);
    log.purge()?;
    drop(log);
    if json {
        println!("{}", serde_json::json!({ "status": "purged" }));
    } else {
        println!("event log purged");
    }
    Ok(())
}
