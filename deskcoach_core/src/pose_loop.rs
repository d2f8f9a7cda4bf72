//! Component F: the pose loop. Owns the camera/pose session, paces sampling
//! at a target FPS with an adaptive governor, feeds the pipeline (metrics ->
//! smoother -> state machine -> notification policy), and publishes status.
//!
//! Step-driven like [`crate::calibration::CalibrationRoutine`]: the caller
//! (conceptually a dedicated background thread, per the acquisition retry
//! loop below) calls [`PoseLoop::step`] once per tick and owns the loop and
//! shutdown flag around it.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use deskcoach_config::{NotificationCfg, PoseLoopCfg};
use deskcoach_traits::{DndQuery, NotificationSink, PoseSource};

use crate::error::PostureError;
use crate::event_log::{EventKind, EventLog, EventRecord};
use crate::metrics::{self, MetricSample, Smoother};
use crate::policy::{Decision, NotificationPolicy, NudgeCandidate};
use crate::state_machine::{PostureState, StateMachine};
use crate::status_bus::{StatusBus, StatusSnapshot};

const ACQUISITION_BACKOFF_START: Duration = Duration::from_millis(100);
const ACQUISITION_BACKOFF_CEIL: Duration = Duration::from_secs(2);
const ACQUISITION_MAX_FAILURES: u32 = 5;
const GOVERNOR_HIGH_FRAME_MS: f64 = 120.0;
const GOVERNOR_LOW_FRAME_MS: f64 = 84.0;
const GOVERNOR_RAISE_SUSTAINED_SEC: f64 = 120.0;

/// What happened during one [`PoseLoop::step`] call, for the caller's own
/// telemetry/logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Processed,
    Skipped,
    NoSubjectDetected,
    CameraDegraded,
    ShuttingDown,
}

struct Governor {
    target_fps: u32,
    min_fps: u32,
    max_fps: u32,
    frame_time_ema_ms: Option<f64>,
    low_streak_since: Option<f64>,
}

impl Governor {
    fn new(cfg: &PoseLoopCfg) -> Self {
        Self {
            target_fps: cfg.fps,
            min_fps: cfg.min_fps,
            max_fps: cfg.max_fps,
            frame_time_ema_ms: None,
            low_streak_since: None,
        }
    }

    fn target_period(&self) -> Duration {
        Duration::from_micros(crate::util::period_us(self.target_fps))
    }

    /// Feed one frame's processing duration; adjust `target_fps` per the
    /// governor rule (§4.F) and return whether it changed.
    fn observe(&mut self, now: f64, frame_ms: f64) -> bool {
        let ema = self.frame_time_ema_ms.get_or_insert(frame_ms);
        *ema += 0.2 * (frame_ms - *ema);
        let ema = *ema;

        if ema > GOVERNOR_HIGH_FRAME_MS {
            self.low_streak_since = None;
            if self.target_fps > self.min_fps {
                self.target_fps -= 1;
                return true;
            }
            return false;
        }

        if ema < GOVERNOR_LOW_FRAME_MS {
            let since = *self.low_streak_since.get_or_insert(now);
            if now - since >= GOVERNOR_RAISE_SUSTAINED_SEC && self.target_fps < self.max_fps {
                self.target_fps += 1;
                self.low_streak_since = Some(now);
                return true;
            }
        } else {
            self.low_streak_since = None;
        }
        false
    }
}

struct SkipState {
    enabled: bool,
    confidence_min: f32,
    good_sustained_sec: f64,
    counter: u32,
}

impl SkipState {
    fn new(cfg: &PoseLoopCfg) -> Self {
        Self {
            enabled: cfg.skip_enabled,
            confidence_min: cfg.skip_confidence_min,
            good_sustained_sec: cfg.skip_good_sustained_sec,
            counter: 0,
        }
    }

    fn should_skip(&mut self, now: f64, state: PostureState, entered_at: f64, last_conf: f32) -> bool {
        let eligible = self.enabled
            && state == PostureState::Good
            && now - entered_at >= self.good_sustained_sec
            && last_conf >= self.confidence_min;
        if !eligible {
            self.counter = 0;
            return false;
        }
        self.counter = self.counter.wrapping_add(1);
        self.counter % 2 == 0
    }
}

/// Ties together acquisition, the geometry/state/policy pipeline, and status
/// publication for one camera session.
pub struct PoseLoop<P, N, D> {
    pose_source: P,
    notification_sink: N,
    dnd: D,
    smoother: Smoother,
    state_machine: StateMachine,
    policy: NotificationPolicy,
    event_log: Arc<EventLog>,
    status_bus: StatusBus,
    governor: Governor,
    skip: SkipState,
    min_visibility: f32,
    consecutive_failures: u32,
    degraded_logged: bool,
    last_confidence: f32,
    last_effective: crate::state_machine::EffectiveThresholds,
    last_neck_stats: crate::windows::WindowStats,
    last_torso_stats: crate::windows::WindowStats,
    last_lateral_stats: crate::windows::WindowStats,
    last_channel: Option<crate::state_machine::Channel>,
    last_path: Option<crate::state_machine::DetectionPath>,
    last_sample: Option<MetricSample>,
    detection_policy: deskcoach_config::Policy,
    shutdown: Arc<AtomicBool>,
    last_dnd_service: Option<f64>,
}

fn zero_stats() -> crate::windows::WindowStats {
    crate::windows::WindowStats { above_fraction: 0.0, cumulative_above_sec: 0.0, max_gap_sec: 0.0 }
}

impl<P: PoseSource, N: NotificationSink, D: DndQuery> PoseLoop<P, N, D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pose_source: P,
        notification_sink: N,
        dnd: D,
        baseline: crate::calibration::Baseline,
        now: f64,
        pose_loop_cfg: PoseLoopCfg,
        notification_cfg: NotificationCfg,
        detection_policy: deskcoach_config::Policy,
        smoothing_alpha: f32,
        min_visibility: f32,
        recovery_window_sec: f64,
        event_log: Arc<EventLog>,
        status_bus: StatusBus,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            pose_source,
            notification_sink,
            dnd,
            smoother: Smoother::new(smoothing_alpha),
            state_machine: StateMachine::new(baseline, now, recovery_window_sec),
            policy: NotificationPolicy::new(notification_cfg),
            event_log,
            status_bus,
            governor: Governor::new(&pose_loop_cfg),
            skip: SkipState::new(&pose_loop_cfg),
            min_visibility,
            consecutive_failures: 0,
            degraded_logged: false,
            last_confidence: 0.0,
            last_effective: crate::state_machine::EffectiveThresholds { neck_deg: 0.0, torso_deg: 0.0, lateral: 0.0 },
            last_neck_stats: zero_stats(),
            last_torso_stats: zero_stats(),
            last_lateral_stats: zero_stats(),
            last_channel: None,
            last_path: None,
            last_sample: None,
            detection_policy,
            shutdown,
            last_dnd_service: None,
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Hot-reload the detection policy and notification gating parameters;
    /// both take effect on the next tick/decision (§4.D, §4.E).
    pub fn reconfigure(&mut self, detection_policy: deskcoach_config::Policy, notification_cfg: NotificationCfg) {
        self.detection_policy = detection_policy;
        self.policy.reconfigure(notification_cfg);
    }

    pub fn target_period(&self) -> Duration {
        self.governor.target_period()
    }

    /// Run one tick. `now` is the pipeline clock (seconds); `policy_cfg` lets
    /// hot-reloaded config changes land before the next decision.
    pub fn step(&mut self, now: f64) -> Result<StepOutcome, PostureError> {
        if self.shutdown.load(Ordering::Relaxed) {
            self.flush_shutdown(now);
            return Ok(StepOutcome::ShuttingDown);
        }

        let capture_started = Instant::now();
        let frame = match self.acquire() {
            Ok(frame) => frame,
            Err(PostureError::Camera(_)) => return Ok(StepOutcome::CameraDegraded),
            Err(e) => return Err(e),
        };
        let frame_ms = capture_started.elapsed().as_secs_f64() * 1000.0;
        if self.governor.observe(now, frame_ms) {
            tracing::info!(target_fps = self.governor.target_fps, "pose loop governor adjusted target fps");
        }

        let Some(frame) = frame else {
            self.dispatch_tick(now, None);
            self.publish_status(now);
            return Ok(StepOutcome::NoSubjectDetected);
        };

        if self.skip.should_skip(now, self.state_machine.state(), self.state_machine.entered_at(), self.last_confidence) {
            self.publish_status(now);
            return Ok(StepOutcome::Skipped);
        }

        let Some(raw) = metrics::extract(&frame, now, self.min_visibility) else {
            self.dispatch_tick(now, None);
            self.publish_status(now);
            return Ok(StepOutcome::NoSubjectDetected);
        };
        self.last_confidence = raw.conf;
        let sample = self.smoother.update(&raw);
        self.dispatch_tick(now, Some(sample));
        self.publish_status(now);
        Ok(StepOutcome::Processed)
    }

    fn acquire(&mut self) -> Result<Option<deskcoach_traits::LandmarkFrame>, PostureError> {
        let mut backoff = ACQUISITION_BACKOFF_START;
        loop {
            match self.pose_source.estimate(Duration::from_millis(500)) {
                Ok(frame) => {
                    self.consecutive_failures = 0;
                    self.degraded_logged = false;
                    return Ok(frame);
                }
                Err(e) => {
                    self.consecutive_failures += 1;
                    if self.consecutive_failures >= ACQUISITION_MAX_FAILURES {
                        if !self.degraded_logged {
                            tracing::warn!(error = %e, "camera degraded after repeated read failures");
                            self.degraded_logged = true;
                        }
                        return Err(PostureError::Camera(e.to_string()));
                    }
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(ACQUISITION_BACKOFF_CEIL);
                }
            }
        }
    }

    fn dispatch_tick(&mut self, now: f64, sample: Option<MetricSample>) {
        if sample.is_some() {
            self.last_sample = sample;
        }
        let backoff = self.policy.active_backoff_deltas(now);
        let outcome = self.state_machine.tick_with_backoff(now, sample, &self.detection_policy, backoff);
        self.last_effective = outcome.effective;
        self.last_neck_stats = outcome.neck_stats;
        self.last_torso_stats = outcome.torso_stats;
        self.last_lateral_stats = outcome.lateral_stats;

        if let Some(transition) = outcome.transition {
            self.last_channel = transition.channel;
            self.last_path = transition.path;
            self.event_log.append(
                EventRecord::new(now, EventKind::StateExited, transition.from.as_str())
                    .with_reason(transition.reason(None)),
            );
            self.event_log.append(
                EventRecord::new(now, EventKind::StateEntered, transition.to.as_str())
                    .with_reason(transition.reason(None)),
            );

            if transition.to.is_issue() {
                let elevated = match transition.channel {
                    Some(ch) => match ch {
                        crate::state_machine::Channel::Neck => outcome.effective.neck_deg,
                        crate::state_machine::Channel::Torso => outcome.effective.torso_deg,
                        crate::state_machine::Channel::Lateral => outcome.effective.lateral,
                    },
                    None => 0.0,
                };
                if let Some(candidate) = NudgeCandidate::from_transition(&transition, elevated) {
                    let dnd_active = self.dnd.is_dnd_active().unwrap_or(false);
                    self.deliver(candidate, dnd_active);
                }
            }
        }

        if self.last_dnd_service.map(|t| now - t >= 1.0).unwrap_or(true) {
            self.last_dnd_service = Some(now);
            let dnd_active = self.dnd.is_dnd_active().unwrap_or(false);
            let last_sample = self.last_sample;
            let last_effective = self.last_effective;
            let current_metric = move |channel: crate::state_machine::Channel| {
                use crate::state_machine::Channel;
                let metric_value = match (last_sample, channel) {
                    (Some(s), Channel::Neck) => s.neck_deg,
                    (Some(s), Channel::Torso) => s.torso_deg,
                    (Some(s), Channel::Lateral) => s.lateral.abs(),
                    (None, _) => 0.0,
                };
                let elevated_threshold = match channel {
                    Channel::Neck => last_effective.neck_deg,
                    Channel::Torso => last_effective.torso_deg,
                    Channel::Lateral => last_effective.lateral,
                };
                (metric_value, elevated_threshold)
            };
            for (channel, decision) in self.policy.service_dnd_queue(now, dnd_active, current_metric) {
                self.log_decision(now, channel, decision, true);
            }
        }
    }

    fn deliver(&mut self, candidate: NudgeCandidate, dnd_active: bool) {
        let now = candidate.now;
        let channel = candidate.channel;
        let decision = self.policy.decide(candidate, dnd_active);
        self.log_decision(now, channel, decision, false);
    }

    fn log_decision(&mut self, now: f64, channel: crate::state_machine::Channel, decision: Decision, from_queue: bool) {
        match decision {
            Decision::Delivered(payload) => {
                let _ = self.notification_sink.notify(&payload.title, &payload.message, &payload.actions);
                let kind = if from_queue { EventKind::DeliveredAfterDnd } else { EventKind::Nudged };
                self.event_log.append(EventRecord::new(now, kind, channel.as_str()));
            }
            Decision::Suppressed(reason) => {
                self.event_log.append(
                    EventRecord::new(now, EventKind::Suppressed, channel.as_str())
                        .with_reason(reason.to_string()),
                );
            }
            Decision::QueuedUnderDnd => {
                self.event_log.append(EventRecord::new(now, EventKind::QueuedUnderDnd, channel.as_str()));
            }
            Decision::ExpiredUnderDnd => {
                self.event_log.append(EventRecord::new(now, EventKind::ExpiredUnderDnd, channel.as_str()));
            }
        }
    }

    /// User-triggered action on the active notification.
    pub fn handle_action(&mut self, now: f64, action_id: &str) {
        match action_id {
            "done" => {
                self.policy.record_done(now);
                self.event_log.append(EventRecord::new(now, EventKind::ActionDone, self.state_machine.state().as_str()));
            }
            "snooze" => {
                self.policy.record_snooze(now);
                self.event_log.append(EventRecord::new(now, EventKind::ActionSnooze, self.state_machine.state().as_str()));
            }
            "dismiss" => {
                self.policy.record_dismiss(now);
                self.event_log.append(EventRecord::new(now, EventKind::ActionDismiss, self.state_machine.state().as_str()));
            }
            other => tracing::warn!(action = other, "unknown notification action ignored"),
        }
    }

    fn publish_status(&mut self, now: f64) {
        let snapshot = StatusSnapshot {
            ts: now,
            state: self.state_machine.state(),
            time_in_state_sec: now - self.state_machine.entered_at(),
            confidence: self.last_confidence,
            effective: self.last_effective,
            neck_window: self.last_neck_stats,
            torso_window: self.last_torso_stats,
            lateral_window: self.last_lateral_stats,
            last_channel: self.last_channel,
            last_path: self.last_path,
            preset: deskcoach_config::SensitivityPreset::default(),
            policy: self.policy.status(now),
        };
        self.status_bus.publish_status(&snapshot);
    }

    fn flush_shutdown(&mut self, now: f64) {
        self.event_log.append(EventRecord::new(now, EventKind::StateExited, self.state_machine.state().as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskcoach_traits::{Landmark, LandmarkFrame, NotificationAction};
    use std::sync::Mutex;

    struct ScriptedPoseSource {
        frames: Vec<Option<LandmarkFrame>>,
        idx: usize,
    }

    impl PoseSource for ScriptedPoseSource {
        fn estimate(&mut self, _timeout: Duration) -> Result<Option<LandmarkFrame>, Box<dyn std::error::Error + Send + Sync>> {
            let frame = self.frames.get(self.idx).cloned().unwrap_or(None);
            self.idx += 1;
            Ok(frame)
        }
    }

    struct RecordingSink {
        delivered: Mutex<Vec<String>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify(&mut self, title: &str, _message: &str, _actions: &[NotificationAction]) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            self.delivered.lock().unwrap().push(title.to_string());
            Ok(true)
        }
    }

    struct NeverDnd;
    impl DndQuery for NeverDnd {
        fn is_dnd_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            Ok(false)
        }
    }

    fn upright_frame() -> LandmarkFrame {
        let mut frame = [Landmark { x: 0.5, y: 0.5, visibility: 0.9 }; deskcoach_traits::LANDMARK_COUNT];
        frame[11] = Landmark { x: 0.4, y: 0.4, visibility: 0.9 };
        frame[12] = Landmark { x: 0.6, y: 0.4, visibility: 0.9 };
        frame[23] = Landmark { x: 0.45, y: 0.7, visibility: 0.9 };
        frame[24] = Landmark { x: 0.55, y: 0.7, visibility: 0.9 };
        frame[7] = Landmark { x: 0.42, y: 0.2, visibility: 0.9 };
        frame[8] = Landmark { x: 0.58, y: 0.2, visibility: 0.9 };
        frame
    }

    fn baseline() -> crate::calibration::Baseline {
        crate::calibration::Baseline {
            neck0: 8.0,
            torso0: 0.0,
            lateral0: 0.02,
            shoulder_width_proxy: 0.2,
            calibrated_at: 0.0,
            sample_count: 100,
            conf_mean: 0.9,
            version: 1,
        }
    }

    #[test]
    fn first_processed_frame_exits_paused() {
        let dir = tempfile::tempdir().unwrap();
        let pose_source = ScriptedPoseSource { frames: vec![Some(upright_frame())], idx: 0 };
        let sink = RecordingSink { delivered: Mutex::new(Vec::new()) };
        let event_log = Arc::new(EventLog::spawn(dir.path().join("events.jsonl"), 64));
        let status_bus = StatusBus::new(dir.path().join("status.json"), dir.path().join("calibration_status.json"));
        let mut pose_loop = PoseLoop::new(
            pose_source,
            sink,
            NeverDnd,
            baseline(),
            0.0,
            PoseLoopCfg::default(),
            NotificationCfg::default(),
            deskcoach_config::Policy::default(),
            0.3,
            0.5,
            12.0,
            event_log,
            status_bus,
            Arc::new(AtomicBool::new(false)),
        );
        let outcome = pose_loop.step(0.0).unwrap();
        assert_eq!(outcome, StepOutcome::Processed);
    }

    #[test]
    fn shutdown_flag_short_circuits_step() {
        let dir = tempfile::tempdir().unwrap();
        let pose_source = ScriptedPoseSource { frames: vec![], idx: 0 };
        let sink = RecordingSink { delivered: Mutex::new(Vec::new()) };
        let event_log = Arc::new(EventLog::spawn(dir.path().join("events.jsonl"), 64));
        let status_bus = StatusBus::new(dir.path().join("status.json"), dir.path().join("calibration_status.json"));
        let shutdown = Arc::new(AtomicBool::new(true));
        let mut pose_loop = PoseLoop::new(
            pose_source,
            sink,
            NeverDnd,
            baseline(),
            0.0,
            PoseLoopCfg::default(),
            NotificationCfg::default(),
            deskcoach_config::Policy::default(),
            0.3,
            0.5,
            12.0,
            event_log,
            status_bus,
            shutdown,
        );
        assert_eq!(pose_loop.step(0.0).unwrap(), StepOutcome::ShuttingDown);
    }
}
