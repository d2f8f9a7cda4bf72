//! Human-readable error descriptions and structured JSON error formatting.
use deskcoach_core::error::{BuildError, PostureError};
use deskcoach_supervisor::SupervisorError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingPoseSource => {
                "What happened: No pose source was wired into the pose loop.\nLikely causes: camera backend failed to initialize.\nHow to fix: check --camera and that a webcam is attached.".to_string()
            }
            BuildError::MissingNotificationSink => {
                "What happened: No notification sink was wired into the pose loop.\nHow to fix: this is an internal wiring bug, please report it.".to_string()
            }
            BuildError::MissingStorageRoot => {
                "What happened: No storage root is available.\nLikely causes: STORAGE_ROOT points at a path that cannot be created.\nHow to fix: set STORAGE_ROOT to a writable directory or pass --storage-root.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nHow to fix: edit config.json and rerun, or delete it to fall back to defaults."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PostureError>() {
        return match pe {
            PostureError::Camera(msg) => format!(
                "What happened: Camera error ({msg}).\nLikely causes: camera is in use by another application or was unplugged.\nHow to fix: close other camera apps, check --camera index, and retry."
            ),
            PostureError::InsufficientSamples { needed, got } => format!(
                "What happened: Calibration captured too few confident samples ({got}/{needed} needed).\nLikely causes: poor lighting or the camera couldn't see your upper body.\nHow to fix: improve lighting/framing and rerun `deskcoach calibrate`."
            ),
            PostureError::CalibrationInProgress(pid) => format!(
                "What happened: A calibration run is already in progress (pid {pid}).\nHow to fix: wait for it to finish, or stop that process if it is stuck."
            ),
            _ => format!(
                "What happened: {pe}.\nHow to fix: re-run with --log-level=debug for more detail."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<SupervisorError>() {
        return format!(
            "What happened: {se}.\nHow to fix: check `deskcoach status` and the daemon.log under the storage root."
        );
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!("Something went wrong.{cause}\nHow to fix: re-run with --log-level=debug for details. Original: {msg}")
}

/// Stable exit codes for scripted callers; non-abort errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<PostureError>().is_some() {
        return 2;
    }
    if err.downcast_ref::<SupervisorError>().is_some() {
        return 3;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
