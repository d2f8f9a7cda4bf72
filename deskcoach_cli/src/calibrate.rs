//! The `calibrate` command: drives `CalibrationRoutine` to completion in the
//! foreground under the single-instance calibration lock (§4.B, §4.I).
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use deskcoach_config::{ConfigDocument, StorageRoot};
use deskcoach_core::calibration::{CalibrationPhase, CalibrationRoutine};
use deskcoach_core::metrics;
use deskcoach_core::status_bus::StatusBus;
use deskcoach_platform::SimulatedPoseSource;
use deskcoach_supervisor::Supervisor;
use deskcoach_traits::PoseSource;

fn now_unix() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

pub fn run(root: StorageRoot, duration_sec: f64, shutdown: Arc<AtomicBool>) -> eyre::Result<()> {
    root.ensure_exists()?;
    let supervisor = Supervisor::new(root.clone());
    let lock = supervisor.acquire_calibration_lock()?;

    let target_fps = match ConfigDocument::load(&root.config_json()) {
        Ok(cfg) => cfg.pose_loop.fps,
        Err(_) => ConfigDocument::default().pose_loop.fps,
    };

    let mut status_bus = StatusBus::new(root.status_json(), root.calibration_status_json());
    let mut pose_source = SimulatedPoseSource::new(Vec::new());
    let mut routine =
        CalibrationRoutine::new(duration_sec, f64::from(target_fps), root.calibration_json(), now_unix());

    println!("Calibrating for {duration_sec:.0}s. Sit in your normal working posture and look at the screen.");

    while !routine.is_terminal() {
        if shutdown.load(Ordering::Relaxed) {
            println!("Calibration cancelled.");
            drop(lock);
            return Ok(());
        }
        let now = now_unix();
        let frame = pose_source.estimate(Duration::from_millis(500)).unwrap_or(None);
        let (sample, width) = match &frame {
            Some(f) => (metrics::extract(f, now, 0.5), Some(metrics::shoulder_width(f))),
            None => (None, None),
        };
        routine.on_sample(now, sample, width);
        status_bus.publish_calibration(&routine.progress(now));
        std::thread::sleep(Duration::from_millis(100));
    }

    drop(lock);

    let final_progress = routine.progress(now_unix());
    match final_progress.phase {
        CalibrationPhase::Done => {
            if let Some(baseline) = final_progress.baseline {
                println!(
                    "Calibration complete: {} samples, mean confidence {:.2}.",
                    baseline.sample_count, baseline.conf_mean
                );
            } else {
                println!("Calibration complete.");
            }
            Ok(())
        }
        _ => {
            let reason = final_progress.error.unwrap_or_else(|| "unknown error".to_string());
            eyre::bail!("calibration failed: {reason}")
        }
    }
}
