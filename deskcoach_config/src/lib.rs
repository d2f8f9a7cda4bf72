#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Configuration schema, presets, and atomic load/save for the posture daemon.
//!
//! `ConfigDocument` is the single JSON document (§4.J, §6) loaded at startup
//! with defaults filled in for any missing key, then validated.
use serde::{Deserialize, Serialize};

pub mod paths;
pub mod presets;

pub use paths::StorageRoot;

/// Write `bytes` to `path` atomically: write to a sibling `.tmp` file, fsync,
/// then rename over the target.
pub fn write_atomic(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        use std::io::Write;
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(tmp, path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityPreset {
    Sensitive,
    Standard,
    Conservative,
}

impl Default for SensitivityPreset {
    fn default() -> Self {
        Self::Standard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerfMode {
    Lightweight,
    Quality,
    Performance,
}

impl Default for PerfMode {
    fn default() -> Self {
        Self::Quality
    }
}

impl PerfMode {
    /// Capture resolution associated with this mode (§4.F).
    pub fn resolution(self) -> (u32, u32) {
        match self {
            PerfMode::Lightweight => (320, 240),
            PerfMode::Performance => (424, 240),
            PerfMode::Quality => (640, 480),
        }
    }
}

/// Per-channel tuning values shared by the detection paths in §4.D.
///
/// `delta_deg` is in degrees for the neck/torso channels; for the lateral
/// channel it holds the configured centimeter delta (`Δ_lateral_cm`), scaled
/// to an effective threshold via the shoulder-width proxy at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelTuning {
    pub delta_deg: f32,
    pub window_sec: f32,
    pub cumulative_min_sec: f32,
}

/// `{Δ_neck_deg, Δ_torso_deg, Δ_lateral_cm, window_sec per channel,
/// majority_fraction, gap_budget_sec, cumulative_min_sec, high_severity_Δ,
/// high_severity_window_sec, recovery_window_sec, drift_α,
/// confidence_threshold}` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub neck: ChannelTuning,
    pub torso: ChannelTuning,
    pub lateral: ChannelTuning,
    pub majority_fraction: f32,
    pub gap_budget_sec: f32,
    pub high_severity_delta_deg: f32,
    pub high_severity_window_sec: f32,
    pub recovery_window_sec: f32,
    pub drift_alpha: f32,
    pub confidence_threshold: f32,
}

impl Default for Policy {
    fn default() -> Self {
        presets::policy_for(SensitivityPreset::default())
    }
}

/// Notification gating parameters (§4.E), independent of the sensitivity preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationCfg {
    pub active_notification_timeout_sec: f64,
    pub dedupe_window_sec: f64,
    pub high_severity_bypass_dedupe: bool,
    pub cooldown_done_sec: f64,
    pub cooldown_snooze_sec: f64,
    pub dismiss_backoff_duration_sec: f64,
    pub dismiss_backoff_delta_deg: f32,
    pub dismiss_backoff_delta_cm: f32,
    pub dnd_queue_expiry_sec: f64,
    pub respect_dnd: bool,
    /// When `false`, the cooldown and snooze gates are skipped entirely
    /// (`--cooldowns off`); every other gate still applies.
    pub cooldowns_enabled: bool,
}

impl Default for NotificationCfg {
    fn default() -> Self {
        Self {
            active_notification_timeout_sec: 10.0,
            dedupe_window_sec: 1200.0,
            high_severity_bypass_dedupe: true,
            cooldown_done_sec: 1800.0,
            cooldown_snooze_sec: 900.0,
            dismiss_backoff_duration_sec: 3600.0,
            dismiss_backoff_delta_deg: 5.0,
            dismiss_backoff_delta_cm: 1.5,
            dnd_queue_expiry_sec: 2700.0,
            respect_dnd: true,
            cooldowns_enabled: true,
        }
    }
}

/// Pose-loop pacing/governor parameters (§4.F).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseLoopCfg {
    pub fps: u32,
    pub camera_index: u32,
    pub perf_mode: PerfMode,
    pub min_fps: u32,
    pub max_fps: u32,
    pub skip_enabled: bool,
    pub skip_confidence_min: f32,
    pub skip_good_sustained_sec: f64,
}

impl Default for PoseLoopCfg {
    fn default() -> Self {
        Self {
            fps: 6,
            camera_index: 0,
            perf_mode: PerfMode::default(),
            min_fps: 4,
            max_fps: 8,
            skip_enabled: true,
            skip_confidence_min: 0.75,
            skip_good_sustained_sec: 20.0,
        }
    }
}

/// The top-level `config.json` document (component J).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub preset: SensitivityPreset,
    pub policy: Policy,
    pub notification: NotificationCfg,
    pub pose_loop: PoseLoopCfg,
    pub smoothing_alpha: f32,
    pub buffer_window_sec: f32,
    pub min_landmark_visibility: f32,
    pub dry_run: bool,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            preset: SensitivityPreset::default(),
            policy: Policy::default(),
            notification: NotificationCfg::default(),
            pose_loop: PoseLoopCfg::default(),
            smoothing_alpha: 0.3,
            buffer_window_sec: 60.0,
            min_landmark_visibility: 0.5,
            dry_run: false,
        }
    }
}

impl ConfigDocument {
    /// Apply a named preset's reference policy, keeping other fields untouched.
    pub fn with_preset(mut self, preset: SensitivityPreset) -> Self {
        self.preset = preset;
        self.policy = presets::policy_for(preset);
        self
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if !(4..=15).contains(&self.pose_loop.fps) {
            eyre::bail!("pose_loop.fps must be in 4..=15");
        }
        if self.pose_loop.min_fps > self.pose_loop.max_fps {
            eyre::bail!("pose_loop.min_fps must be <= pose_loop.max_fps");
        }
        if !(0.1..=0.5).contains(&self.smoothing_alpha) {
            eyre::bail!("smoothing_alpha must be in [0.1, 0.5]");
        }
        if !(30.0..=120.0).contains(&self.buffer_window_sec) {
            eyre::bail!("buffer_window_sec must be in [30.0, 120.0]");
        }
        if !(0.0..=1.0).contains(&self.min_landmark_visibility) {
            eyre::bail!("min_landmark_visibility must be in [0.0, 1.0]");
        }
        if !(0.5..=0.9).contains(&self.policy.majority_fraction) {
            eyre::bail!("policy.majority_fraction must be in [0.5, 0.9]");
        }
        if self.policy.gap_budget_sec < 0.0 {
            eyre::bail!("policy.gap_budget_sec must be >= 0.0");
        }
        if !(0.0..=1.0).contains(&self.policy.confidence_threshold) {
            eyre::bail!("policy.confidence_threshold must be in [0.0, 1.0]");
        }
        for (name, ch) in [
            ("neck", &self.policy.neck),
            ("torso", &self.policy.torso),
            ("lateral", &self.policy.lateral),
        ] {
            if ch.delta_deg <= 0.0 {
                eyre::bail!("policy.{name}.delta_deg must be > 0.0");
            }
            if ch.window_sec <= 0.0 {
                eyre::bail!("policy.{name}.window_sec must be > 0.0");
            }
            if ch.cumulative_min_sec <= 0.0 || ch.cumulative_min_sec > ch.window_sec {
                eyre::bail!("policy.{name}.cumulative_min_sec must be in (0.0, window_sec]");
            }
        }
        if self.notification.dedupe_window_sec < 0.0 {
            eyre::bail!("notification.dedupe_window_sec must be >= 0.0");
        }
        if self.notification.active_notification_timeout_sec <= 0.0 {
            eyre::bail!("notification.active_notification_timeout_sec must be > 0.0");
        }
        Ok(())
    }

    /// Parse from a JSON document, filling in defaults for absent keys.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Load from `path`, validating the result. Callers implementing §7's
    /// "Config parse error -> fall back to defaults, log; continue" should
    /// catch the error and substitute `ConfigDocument::default()`.
    pub fn load(path: &std::path::Path) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let doc = Self::from_json(&text)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Save atomically (write-temp + rename), matching §4.J and the status
    /// bus's publisher discipline.
    pub fn save(&self, path: &std::path::Path) -> eyre::Result<()> {
        self.validate()?;
        let json = self.to_json_pretty()?;
        write_atomic(path, json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        ConfigDocument::default().validate().unwrap();
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let doc = ConfigDocument::from_json("{}").unwrap();
        assert_eq!(doc.pose_loop.fps, 6);
        assert_eq!(doc.preset, SensitivityPreset::Standard);
    }

    #[test]
    fn rejects_fps_out_of_range() {
        let mut doc = ConfigDocument::default();
        doc.pose_loop.fps = 2;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn rejects_bad_majority_fraction() {
        let mut doc = ConfigDocument::default();
        doc.policy.majority_fraction = 0.99;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn save_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let doc = ConfigDocument::default().with_preset(SensitivityPreset::Sensitive);
        doc.save(&path).unwrap();
        let loaded = ConfigDocument::load(&path).unwrap();
        assert_eq!(loaded.preset, SensitivityPreset::Sensitive);
        assert_eq!(loaded.policy.neck.delta_deg, 8.0);
        assert!(!path.with_extension("tmp").exists());
    }
}
