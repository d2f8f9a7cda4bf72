//! The `run` command: assembles the pose loop from config + baseline and
//! drives it tick by tick until shutdown (§4.F, §5).
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use deskcoach_config::{ConfigDocument, PerfMode, SensitivityPreset, StorageRoot};
use deskcoach_core::calibration::Baseline;
use deskcoach_core::event_log::EventLog;
use deskcoach_core::pose_loop::{PoseLoop, StepOutcome};
use deskcoach_core::status_bus::StatusBus;
use deskcoach_platform::{DryRunNotifier, NullDnd, SimulatedPoseSource};
use deskcoach_traits::NotificationSink;

use crate::cli::{CliPerfMode, CliPreset, CooldownsFlag};

/// Picks the real desktop notifier when built with `desktop-notify` and the
/// run isn't `--dry-run`; falls back to the recording sink otherwise, the
/// same shape as the teacher's `#[cfg(feature = "hardware")]` scale/motor
/// selection in `doser_cli::main`.
#[cfg(feature = "desktop-notify")]
fn build_notifier(dry_run: bool) -> Box<dyn NotificationSink> {
    if dry_run {
        Box::new(DryRunNotifier::new())
    } else {
        Box::new(deskcoach_platform::DesktopNotifier::new())
    }
}

#[cfg(not(feature = "desktop-notify"))]
fn build_notifier(_dry_run: bool) -> Box<dyn NotificationSink> {
    Box::new(DryRunNotifier::new())
}

#[allow(clippy::too_many_arguments)]
pub struct RunOverrides {
    pub fps: Option<u32>,
    pub camera: Option<u32>,
    pub preset: Option<CliPreset>,
    pub perf_mode: Option<CliPerfMode>,
    pub diagnostics: bool,
    pub perf_profile: bool,
    pub dry_run: bool,
    pub no_dnd_check: bool,
    pub cooldowns: Option<CooldownsFlag>,
}

fn now_unix() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

fn load_config(root: &StorageRoot) -> ConfigDocument {
    let path = root.config_json();
    match ConfigDocument::load(&path) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "config load failed, falling back to defaults");
            ConfigDocument::default()
        }
    }
}

fn apply_overrides(mut cfg: ConfigDocument, overrides: &RunOverrides) -> ConfigDocument {
    if let Some(preset) = overrides.preset {
        cfg = cfg.with_preset(preset.into());
    }
    if let Some(fps) = overrides.fps {
        cfg.pose_loop.fps = fps;
    }
    if let Some(camera) = overrides.camera {
        cfg.pose_loop.camera_index = camera;
    }
    if let Some(perf_mode) = overrides.perf_mode {
        cfg.pose_loop.perf_mode = perf_mode.into();
    }
    if overrides.dry_run {
        cfg.dry_run = true;
    }
    if overrides.no_dnd_check {
        cfg.notification.respect_dnd = false;
    }
    if let Some(cooldowns) = overrides.cooldowns {
        cfg.notification.cooldowns_enabled = matches!(cooldowns, CooldownsFlag::On);
    }
    cfg
}

fn print_perf_profile(cfg: &ConfigDocument) {
    let (w, h) = cfg.pose_loop.perf_mode.resolution();
    println!("preset: {:?}", cfg.preset);
    println!("perf_mode: {:?} ({w}x{h})", cfg.pose_loop.perf_mode);
    println!(
        "fps: target={} min={} max={}",
        cfg.pose_loop.fps, cfg.pose_loop.min_fps, cfg.pose_loop.max_fps
    );
    println!("skip_enabled: {}", cfg.pose_loop.skip_enabled);
}

/// Run the daemon in the foreground until SIGINT/SIGTERM sets `shutdown`.
pub fn run(root: StorageRoot, overrides: RunOverrides, shutdown: Arc<AtomicBool>) -> eyre::Result<()> {
    root.ensure_exists()?;
    let mut cfg = load_config(&root);
    cfg = apply_overrides(cfg, &overrides);
    cfg.validate()?;

    if overrides.perf_profile {
        print_perf_profile(&cfg);
        return Ok(());
    }

    let event_log = Arc::new(EventLog::spawn(root.events_jsonl(), 256));

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(());
        }
        match Baseline::load(&root.calibration_json()) {
            Ok(baseline) => {
                return run_with_baseline(root, cfg, baseline, event_log, overrides, shutdown);
            }
            Err(_) => {
                tracing::warn!(
                    "no calibration baseline found, running paused-until-calibrated; run `deskcoach calibrate`"
                );
                let snapshot = serde_json::json!({
                    "ts": now_unix(),
                    "state": "paused_uncalibrated",
                });
                let mut status = StatusBus::new(root.status_json(), root.calibration_status_json());
                status.status.publish(&snapshot);
                std::thread::sleep(std::time::Duration::from_secs(2));
            }
        }
    }
}

fn run_with_baseline(
    root: StorageRoot,
    cfg: ConfigDocument,
    baseline: Baseline,
    event_log: Arc<EventLog>,
    overrides: RunOverrides,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let status_bus = StatusBus::new(root.status_json(), root.calibration_status_json());
    let pose_source = SimulatedPoseSource::new(Vec::new());
    let dnd = NullDnd;
    let sink = build_notifier(cfg.dry_run);

    let mut pose_loop = PoseLoop::new(
        pose_source,
        sink,
        dnd,
        baseline,
        now_unix(),
        cfg.pose_loop,
        cfg.notification,
        cfg.policy,
        cfg.smoothing_alpha,
        cfg.min_landmark_visibility,
        cfg.policy.recovery_window_sec as f64,
        event_log,
        status_bus,
        Arc::clone(&shutdown),
    );

    tracing::info!(preset = ?cfg.preset, dry_run = cfg.dry_run, "deskcoach daemon started");

    loop {
        let tick_started = Instant::now();
        let now = now_unix();
        match pose_loop.step(now) {
            Ok(StepOutcome::ShuttingDown) => {
                tracing::info!("daemon shutting down");
                return Ok(());
            }
            Ok(outcome) => {
                if overrides.diagnostics {
                    tracing::debug!(?outcome, "tick");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "pose loop tick failed");
            }
        }
        let period = pose_loop.target_period();
        let elapsed = tick_started.elapsed();
        if elapsed < period {
            std::thread::sleep(period - elapsed);
        }
    }
}
