//! Component B: the calibration routine that fixes a per-user baseline.
//!
//! Phases (published via `CalibrationProgress`): `preparing` (~3 s
//! countdown), `capturing` (duration D, rejecting low-confidence frames),
//! `aggregating` (median), `saving` (atomic write), `done` or `error`.
//! Driven step-by-step by the same loop that runs the live pose pipeline —
//! no async, no dedicated thread of its own.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PostureError;
use crate::metrics::MetricSample;
use crate::util::write_atomic;

const PREPARING_SEC: f64 = 3.0;
const DEFAULT_DURATION_SEC: f64 = 25.0;
const MIN_CONF: f32 = 0.5;

/// `{neck0, torso0, lateral0, shoulder_width_proxy, calibrated_at,
/// sample_count, conf_mean, version}` (§3). Written exactly once per
/// calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub neck0: f32,
    pub torso0: f32,
    pub lateral0: f32,
    pub shoulder_width_proxy: f32,
    pub calibrated_at: f64,
    pub sample_count: usize,
    pub conf_mean: f32,
    pub version: u32,
}

impl Baseline {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn load(path: &Path) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> eyre::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPhase {
    Preparing,
    Capturing,
    Aggregating,
    Saving,
    Done,
    Error,
}

/// `{phase, progress, elapsed_sec, samples_captured, conf_mean, eta_sec?,
/// baseline?, error?}` (§3). Rewritten whole at ≤4 Hz during calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub phase: CalibrationPhase,
    pub progress: f32,
    pub elapsed_sec: f64,
    pub samples_captured: usize,
    pub conf_mean: f32,
    pub eta_sec: Option<f64>,
    pub baseline: Option<Baseline>,
    pub error: Option<String>,
}

struct Accepted {
    sample: MetricSample,
    shoulder_width: f32,
}

/// Step-driven calibration state machine. Call `on_sample` once per captured
/// frame (or `None` for a frame the loop could not process) and read
/// `progress()` for the current snapshot.
pub struct CalibrationRoutine {
    duration_sec: f64,
    target_fps: f64,
    baseline_path: PathBuf,
    phase: CalibrationPhase,
    started_at: f64,
    phase_started_at: f64,
    accepted: Vec<Accepted>,
    error: Option<String>,
    baseline: Option<Baseline>,
}

impl CalibrationRoutine {
    /// `duration_sec` (D) must be in `[15, 45]`; out-of-range values are
    /// clamped. `target_fps` is the pose loop's configured sampling rate
    /// (§4.F `pose_loop.fps`), used to compute the §4.B acceptance floor —
    /// it must not be derived from the sample count under test.
    pub fn new(duration_sec: f64, target_fps: f64, baseline_path: PathBuf, now: f64) -> Self {
        Self {
            duration_sec: duration_sec.clamp(15.0, 45.0),
            target_fps: target_fps.max(1.0),
            baseline_path,
            phase: CalibrationPhase::Preparing,
            started_at: now,
            phase_started_at: now,
            accepted: Vec::new(),
            error: None,
            baseline: None,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, CalibrationPhase::Done | CalibrationPhase::Error)
    }

    /// Advance the routine given the current time and (optionally) a fresh
    /// raw sample plus its shoulder-width proxy. Returns the current phase
    /// after advancing.
    pub fn on_sample(
        &mut self,
        now: f64,
        sample: Option<MetricSample>,
        shoulder_width: Option<f32>,
    ) -> CalibrationPhase {
        match self.phase {
            CalibrationPhase::Preparing => {
                if now - self.phase_started_at >= PREPARING_SEC {
                    self.enter(CalibrationPhase::Capturing, now);
                }
            }
            CalibrationPhase::Capturing => {
                if let (Some(sample), Some(width)) = (sample, shoulder_width) {
                    if sample.conf >= MIN_CONF {
                        self.accepted.push(Accepted { sample, shoulder_width: width });
                    }
                }
                if now - self.phase_started_at >= self.duration_sec {
                    self.enter(CalibrationPhase::Aggregating, now);
                }
            }
            CalibrationPhase::Aggregating => {
                self.aggregate(now);
            }
            CalibrationPhase::Saving => {
                self.save(now);
            }
            CalibrationPhase::Done | CalibrationPhase::Error => {}
        }
        self.phase
    }

    fn enter(&mut self, phase: CalibrationPhase, now: f64) {
        self.phase = phase;
        self.phase_started_at = now;
    }

    fn aggregate(&mut self, now: f64) {
        let needed = (0.3 * self.duration_sec * self.target_fps).ceil() as usize;
        if self.accepted.len() < needed {
            self.error = Some(
                PostureError::InsufficientSamples {
                    needed,
                    got: self.accepted.len(),
                }
                .to_string(),
            );
            self.enter(CalibrationPhase::Error, now);
            return;
        }

        let mut necks: Vec<f32> = self.accepted.iter().map(|a| a.sample.neck_deg).collect();
        let mut torsos: Vec<f32> = self.accepted.iter().map(|a| a.sample.torso_deg).collect();
        let mut laterals: Vec<f32> = self.accepted.iter().map(|a| a.sample.lateral).collect();
        let mut widths: Vec<f32> = self.accepted.iter().map(|a| a.shoulder_width).collect();
        let conf_mean =
            self.accepted.iter().map(|a| a.sample.conf).sum::<f32>() / self.accepted.len() as f32;

        self.baseline = Some(Baseline {
            neck0: median(&mut necks),
            torso0: median(&mut torsos),
            lateral0: median(&mut laterals),
            shoulder_width_proxy: median(&mut widths),
            calibrated_at: now,
            sample_count: self.accepted.len(),
            conf_mean,
            version: Baseline::CURRENT_VERSION,
        });
        self.enter(CalibrationPhase::Saving, now);
    }

    fn save(&mut self, now: f64) {
        let Some(baseline) = self.baseline else {
            self.error = Some("aggregation produced no baseline".to_string());
            self.enter(CalibrationPhase::Error, now);
            return;
        };
        match baseline.save(&self.baseline_path) {
            Ok(()) => self.enter(CalibrationPhase::Done, now),
            Err(e) => {
                self.error = Some(e.to_string());
                self.enter(CalibrationPhase::Error, now);
            }
        }
    }

    pub fn progress(&self, now: f64) -> CalibrationProgress {
        let elapsed = now - self.started_at;
        let conf_mean = if self.accepted.is_empty() {
            0.0
        } else {
            self.accepted.iter().map(|a| a.sample.conf).sum::<f32>() / self.accepted.len() as f32
        };
        let progress = match self.phase {
            CalibrationPhase::Preparing => {
                ((now - self.phase_started_at) / PREPARING_SEC).clamp(0.0, 1.0) * 0.1
            }
            CalibrationPhase::Capturing => {
                0.1 + ((now - self.phase_started_at) / self.duration_sec).clamp(0.0, 1.0) * 0.8
            }
            CalibrationPhase::Aggregating => 0.9,
            CalibrationPhase::Saving => 0.95,
            CalibrationPhase::Done => 1.0,
            CalibrationPhase::Error => 1.0,
        };
        let eta_sec = match self.phase {
            CalibrationPhase::Preparing | CalibrationPhase::Capturing => {
                Some((self.total_sec() - elapsed).max(0.0))
            }
            _ => None,
        };
        CalibrationProgress {
            phase: self.phase,
            progress,
            elapsed_sec: elapsed,
            samples_captured: self.accepted.len(),
            conf_mean,
            eta_sec,
            baseline: self.baseline,
            error: self.error.clone(),
        }
    }

    fn total_sec(&self) -> f64 {
        PREPARING_SEC + self.duration_sec
    }
}

impl Default for CalibrationRoutine {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_SEC, PathBuf::from("calibration.json"), 0.0)
    }
}

/// In-place median. Empty input returns 0.0.
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
