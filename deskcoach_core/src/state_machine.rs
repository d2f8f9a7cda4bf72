//! Component D: the posture state machine. Converts a stream of (possibly
//! null) smoothed metric samples into sustained posture states using
//! majority/cumulative/high-severity detection, with recovery and optional
//! drift.
use deskcoach_config::Policy;
use serde::Serialize;

use crate::calibration::Baseline;
use crate::metrics::MetricSample;
use crate::windows::ConditionWindow;

/// One of `{GOOD, SLOUCH, FORWARD_LEAN, LATERAL_LEAN, PAUSED}` (§3). Exactly
/// one active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureState {
    Good,
    Slouch,
    ForwardLean,
    LateralLean,
    Paused,
}

impl PostureState {
    pub fn is_issue(self) -> bool {
        matches!(self, PostureState::Slouch | PostureState::ForwardLean | PostureState::LateralLean)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostureState::Good => "good",
            PostureState::Slouch => "slouch",
            PostureState::ForwardLean => "forward_lean",
            PostureState::LateralLean => "lateral_lean",
            PostureState::Paused => "paused",
        }
    }
}

/// A posture channel: neck flexion, torso flexion, or lateral lean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Neck,
    Torso,
    Lateral,
}

impl Channel {
    pub fn issue_state(self) -> PostureState {
        match self {
            Channel::Neck => PostureState::Slouch,
            Channel::Torso => PostureState::ForwardLean,
            Channel::Lateral => PostureState::LateralLean,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Neck => "neck",
            Channel::Torso => "torso",
            Channel::Lateral => "lateral",
        }
    }
}

/// Which detection path fired a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPath {
    Majority,
    Cumulative,
    HighSeverity,
    Recovery,
    PausedExit,
    PausedEntry,
}

impl DetectionPath {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionPath::Majority => "majority",
            DetectionPath::Cumulative => "cumulative",
            DetectionPath::HighSeverity => "high_severity",
            DetectionPath::Recovery => "recovery",
            DetectionPath::PausedExit => "paused_exit",
            DetectionPath::PausedEntry => "paused_entry",
        }
    }
}

/// A state transition event, carrying its channel/path/reason and the metric
/// snapshot that triggered it.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub ts: f64,
    pub from: PostureState,
    pub to: PostureState,
    pub channel: Option<Channel>,
    pub path: Option<DetectionPath>,
    pub metric: Option<MetricSample>,
    /// True when the firing channel's metric was already beyond
    /// `baseline + high_severity_Δ` at the moment this transition fired.
    /// Feeds the notification policy's dedupe-bypass gate (§4.E).
    pub high_severity: bool,
}

impl Transition {
    /// Human-readable reason string recording which path fired and the
    /// relevant numerical witnesses.
    pub fn reason(&self, stats: Option<crate::windows::WindowStats>) -> String {
        let path = self.path.map(DetectionPath::as_str).unwrap_or("none");
        match (self.channel, stats) {
            (Some(ch), Some(s)) => format!(
                "{path} on {} (above_fraction={:.2}, cumulative={:.1}s, max_gap={:.1}s)",
                ch.as_str(),
                s.above_fraction,
                s.cumulative_above_sec,
                s.max_gap_sec
            ),
            _ => path.to_string(),
        }
    }
}

struct HighSeverityTimer {
    elevated_since: Option<f64>,
}

impl HighSeverityTimer {
    fn new() -> Self {
        Self { elevated_since: None }
    }

    /// Feed the current tick; returns true once the continuous elevated run
    /// reaches `window_sec`.
    fn tick(&mut self, now: f64, elevated: bool, window_sec: f64) -> bool {
        if elevated {
            let since = *self.elevated_since.get_or_insert(now);
            now - since >= window_sec
        } else {
            self.elevated_since = None;
            false
        }
    }
}

/// Temporary per-channel effective-threshold increase applied while a
/// dismiss-backoff is active (§4.D, §4.E).
#[derive(Debug, Clone, Copy, Default)]
pub struct BackoffDeltas {
    pub neck_deg: f32,
    pub torso_deg: f32,
    pub lateral_cm: f32,
}

/// Effective threshold for the lateral channel from a configured centimeter
/// delta: `ratio = Δ_cm / 40cm; threshold = baseline + baseline * ratio * 2`.
fn lateral_effective_threshold(baseline_lateral: f32, delta_cm: f32) -> f32 {
    let base = baseline_lateral.abs();
    let ratio = delta_cm / 40.0;
    base + base * ratio * 2.0
}

pub struct StateMachine {
    state: PostureState,
    entered_at: f64,
    neck_window: ConditionWindow,
    torso_window: ConditionWindow,
    lateral_window: ConditionWindow,
    recovery_window: ConditionWindow,
    neck_high_sev: HighSeverityTimer,
    torso_high_sev: HighSeverityTimer,
    lateral_high_sev: HighSeverityTimer,
    /// Runtime-only shadow baseline, nudged toward GOOD samples when
    /// `drift_alpha > 0`. Reset to the persisted baseline on restart.
    drift_baseline: Baseline,
}

/// Result of one state-machine tick.
pub struct TickOutcome {
    pub transition: Option<Transition>,
    pub effective: EffectiveThresholds,
    pub neck_stats: crate::windows::WindowStats,
    pub torso_stats: crate::windows::WindowStats,
    pub lateral_stats: crate::windows::WindowStats,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EffectiveThresholds {
    pub neck_deg: f32,
    pub torso_deg: f32,
    pub lateral: f32,
}

impl StateMachine {
    pub fn new(baseline: Baseline, now: f64, recovery_window_sec: f64) -> Self {
        Self {
            state: PostureState::Paused,
            entered_at: now,
            neck_window: ConditionWindow::new(120.0),
            torso_window: ConditionWindow::new(120.0),
            lateral_window: ConditionWindow::new(120.0),
            recovery_window: ConditionWindow::new(recovery_window_sec),
            neck_high_sev: HighSeverityTimer::new(),
            torso_high_sev: HighSeverityTimer::new(),
            lateral_high_sev: HighSeverityTimer::new(),
            drift_baseline: baseline,
        }
    }

    pub fn state(&self) -> PostureState {
        self.state
    }

    pub fn entered_at(&self) -> f64 {
        self.entered_at
    }

    pub fn drift_baseline(&self) -> &Baseline {
        &self.drift_baseline
    }

    fn clear_windows(&mut self) {
        self.neck_window.clear();
        self.torso_window.clear();
        self.lateral_window.clear();
        self.recovery_window.clear();
    }

    fn transition_to(&mut self, to: PostureState, now: f64) {
        self.clear_windows();
        self.state = to;
        self.entered_at = now;
    }

    /// Advance the machine by one tick. `sample` is `None` on a paused/low
    /// confidence frame (caller has already applied the confidence gate).
    pub fn tick(&mut self, now: f64, sample: Option<MetricSample>, policy: &Policy) -> TickOutcome {
        let backoff = BackoffDeltas::default();
        self.tick_with_backoff(now, sample, policy, backoff)
    }

    pub fn tick_with_backoff(
        &mut self,
        now: f64,
        sample: Option<MetricSample>,
        policy: &Policy,
        backoff: BackoffDeltas,
    ) -> TickOutcome {
        let effective = self.effective_thresholds(policy, backoff);

        let Some(sample) = sample.filter(|s| s.conf >= policy.confidence_threshold) else {
            // Confidence gate failed (or no sample at all): push false into
            // every window so decay/eviction still progresses, and force PAUSED.
            self.neck_window.push(now, false);
            self.torso_window.push(now, false);
            self.lateral_window.push(now, false);
            if self.state.is_issue() {
                self.recovery_window.push(now, false);
            }
            let from = self.state;
            if from != PostureState::Paused {
                let transition = Transition {
                    ts: now,
                    from,
                    to: PostureState::Paused,
                    channel: None,
                    path: Some(DetectionPath::PausedEntry),
                    metric: None,
                    high_severity: false,
                };
                self.transition_to(PostureState::Paused, now);
                let (neck_stats, torso_stats, lateral_stats) = self.snapshot_stats(now, policy);
                return TickOutcome { transition: Some(transition), effective, neck_stats, torso_stats, lateral_stats };
            }
            let (neck_stats, torso_stats, lateral_stats) = self.snapshot_stats(now, policy);
            return TickOutcome { transition: None, effective, neck_stats, torso_stats, lateral_stats };
        };

        // Exit PAUSED on the first confident sample; no detection this tick
        // (windows were just cleared and need repopulation time).
        if self.state == PostureState::Paused {
            let transition = Transition {
                ts: now,
                from: PostureState::Paused,
                to: PostureState::Good,
                channel: None,
                path: Some(DetectionPath::PausedExit),
                metric: Some(sample),
                high_severity: false,
            };
            self.transition_to(PostureState::Good, now);
            self.neck_window.push(now, false);
            self.torso_window.push(now, false);
            self.lateral_window.push(now, false);
            let (neck_stats, torso_stats, lateral_stats) = self.snapshot_stats(now, policy);
            return TickOutcome { transition: Some(transition), effective, neck_stats, torso_stats, lateral_stats };
        }

        let above_neck = sample.neck_deg >= effective.neck_deg;
        let above_torso = sample.torso_deg >= effective.torso_deg;
        let above_lateral = sample.lateral.abs() >= effective.lateral;
        self.neck_window.push(now, above_neck);
        self.torso_window.push(now, above_torso);
        self.lateral_window.push(now, above_lateral);

        if policy.drift_alpha > 0.0 && self.state == PostureState::Good {
            self.apply_drift(&sample, policy.drift_alpha);
        }

        // Recovery check takes priority: if currently in an issue state, see
        // whether it has recovered before checking for a (possibly
        // different, higher-priority) new issue.
        if self.state.is_issue() {
            let channel = self.current_issue_channel();
            let above = match channel {
                Channel::Neck => above_neck,
                Channel::Torso => above_torso,
                Channel::Lateral => above_lateral,
            };
            self.recovery_window.push(now, above);
            let stats = self.recovery_window.stats(now, self.recovery_window.retain_sec());
            if stats.above_fraction < (1.0 - policy.majority_fraction) {
                let transition = Transition {
                    ts: now,
                    from: self.state,
                    to: PostureState::Good,
                    channel: Some(channel),
                    path: Some(DetectionPath::Recovery),
                    metric: Some(sample),
                    high_severity: false,
                };
                self.transition_to(PostureState::Good, now);
                let (neck_stats, torso_stats, lateral_stats) = self.snapshot_stats(now, policy);
                return TickOutcome { transition: Some(transition), effective, neck_stats, torso_stats, lateral_stats };
            }
        }

        // Detection, priority order Slouch -> Forward-lean -> Lateral-lean.
        let candidates = [
            (Channel::Neck, above_neck, &policy.neck, sample.neck_deg, effective.neck_deg + policy.high_severity_delta_deg),
            (Channel::Torso, above_torso, &policy.torso, sample.torso_deg, effective.torso_deg + policy.high_severity_delta_deg),
            (
                Channel::Lateral,
                above_lateral,
                &policy.lateral,
                sample.lateral.abs(),
                lateral_effective_threshold(
                    self.drift_baseline.lateral0,
                    policy.lateral.delta_deg + policy.high_severity_delta_deg,
                ),
            ),
        ];

        for (channel, _above, tuning, metric_value, high_sev_threshold) in candidates {
            if self.state == channel.issue_state() {
                continue; // already here; recovery handles the exit path
            }
            let window = match channel {
                Channel::Neck => &self.neck_window,
                Channel::Torso => &self.torso_window,
                Channel::Lateral => &self.lateral_window,
            };
            let stats = window.stats(now, tuning.window_sec as f64);
            let majority = stats.above_fraction >= policy.majority_fraction
                && stats.max_gap_sec <= policy.gap_budget_sec;
            let cumulative = stats.cumulative_above_sec >= tuning.cumulative_min_sec;

            let elevated = metric_value >= high_sev_threshold;
            let high_sev_timer = match channel {
                Channel::Neck => &mut self.neck_high_sev,
                Channel::Torso => &mut self.torso_high_sev,
                Channel::Lateral => &mut self.lateral_high_sev,
            };
            let high_sev = high_sev_timer.tick(now, elevated, policy.high_severity_window_sec as f64);

            let path = if majority {
                Some(DetectionPath::Majority)
            } else if cumulative {
                Some(DetectionPath::Cumulative)
            } else if high_sev {
                Some(DetectionPath::HighSeverity)
            } else {
                None
            };

            if let Some(path) = path {
                let transition = Transition {
                    ts: now,
                    from: self.state,
                    to: channel.issue_state(),
                    channel: Some(channel),
                    path: Some(path),
                    metric: Some(sample),
                    high_severity: elevated,
                };
                self.transition_to(channel.issue_state(), now);
                let (neck_stats, torso_stats, lateral_stats) = self.snapshot_stats(now, policy);
                return TickOutcome { transition: Some(transition), effective, neck_stats, torso_stats, lateral_stats };
            }
        }

        let (neck_stats, torso_stats, lateral_stats) = self.snapshot_stats(now, policy);
        TickOutcome { transition: None, effective, neck_stats, torso_stats, lateral_stats }
    }

    fn snapshot_stats(&self, now: f64, policy: &Policy) -> (crate::windows::WindowStats, crate::windows::WindowStats, crate::windows::WindowStats) {
        (
            self.neck_window.stats(now, policy.neck.window_sec as f64),
            self.torso_window.stats(now, policy.torso.window_sec as f64),
            self.lateral_window.stats(now, policy.lateral.window_sec as f64),
        )
    }

    fn current_issue_channel(&self) -> Channel {
        match self.state {
            PostureState::Slouch => Channel::Neck,
            PostureState::ForwardLean => Channel::Torso,
            PostureState::LateralLean => Channel::Lateral,
            _ => Channel::Neck,
        }
    }

    fn effective_thresholds(&self, policy: &Policy, backoff: BackoffDeltas) -> EffectiveThresholds {
        EffectiveThresholds {
            neck_deg: self.drift_baseline.neck0 + policy.neck.delta_deg + backoff.neck_deg,
            torso_deg: self.drift_baseline.torso0 + policy.torso.delta_deg + backoff.torso_deg,
            lateral: lateral_effective_threshold(
                self.drift_baseline.lateral0,
                policy.lateral.delta_deg + backoff.lateral_cm,
            ),
        }
    }

    fn apply_drift(&mut self, sample: &MetricSample, alpha: f32) {
        self.drift_baseline.neck0 += alpha * (sample.neck_deg - self.drift_baseline.neck0);
        self.drift_baseline.torso0 += alpha * (sample.torso_deg - self.drift_baseline.torso0);
        self.drift_baseline.lateral0 += alpha * (sample.lateral - self.drift_baseline.lateral0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> Baseline {
        Baseline {
            neck0: 8.4,
            torso0: 0.0,
            lateral0: 0.02,
            shoulder_width_proxy: 0.2,
            calibrated_at: 0.0,
            sample_count: 100,
            conf_mean: 0.9,
            version: 1,
        }
    }

    fn sample(ts: f64, neck: f32, conf: f32) -> MetricSample {
        MetricSample { ts, neck_deg: neck, torso_deg: 0.0, lateral: 0.0, conf }
    }

    #[test]
    fn starts_paused_and_exits_on_first_confident_sample() {
        let mut sm = StateMachine::new(baseline(), 0.0, 12.0);
        assert_eq!(sm.state(), PostureState::Paused);
        let policy = Policy::default();
        let outcome = sm.tick(0.0, Some(sample(0.0, 8.4, 0.9)), &policy);
        assert_eq!(sm.state(), PostureState::Good);
        assert!(outcome.transition.is_some());
    }

    #[test]
    fn low_confidence_forces_paused() {
        let mut sm = StateMachine::new(baseline(), 0.0, 12.0);
        sm.tick(0.0, Some(sample(0.0, 8.4, 0.9)), &Policy::default());
        let policy = Policy::default();
        let outcome = sm.tick(1.0, Some(sample(1.0, 8.4, 0.1)), &policy);
        assert_eq!(sm.state(), PostureState::Paused);
        assert!(outcome.transition.is_some());
    }

    #[test]
    fn sustained_slouch_majority_path_fires() {
        let policy = deskcoach_config::presets::policy_for(deskcoach_config::SensitivityPreset::Sensitive);
        let mut sm = StateMachine::new(baseline(), 0.0, policy.recovery_window_sec as f64);
        sm.tick(0.0, Some(sample(0.0, 8.4, 0.9)), &policy); // exit paused

        let mut fired = false;
        let mut t = 0.1_f64;
        while t <= 30.0 {
            let neck = if (t as u32) % 4 == 0 { 15.0 } else { 19.5 };
            let outcome = sm.tick(t, Some(sample(t, neck, 0.9)), &policy);
            if let Some(tr) = outcome.transition {
                assert_eq!(tr.to, PostureState::Slouch);
                fired = true;
                break;
            }
            t += 0.25;
        }
        assert!(fired, "expected a GOOD -> SLOUCH transition within 30s");
    }
}
