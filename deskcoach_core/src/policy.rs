//! Component E: the notification policy. Consumes issue-entering state
//! transitions and user actions, applies an ordered gate chain, and either
//! delivers, suppresses, or queues a nudge behind do-not-disturb.
use deskcoach_config::NotificationCfg;
use deskcoach_traits::NotificationAction;
use serde::Serialize;

use crate::error::GateReason;
use crate::state_machine::{BackoffDeltas, Channel, PostureState, Transition};

/// A ready-to-deliver notification payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub actions: Vec<NotificationAction>,
}

fn payload_for(channel: Channel, state: PostureState) -> NotificationPayload {
    let (title, message) = match channel {
        Channel::Neck => ("Posture check", "Your neck has been dropping for a while."),
        Channel::Torso => ("Posture check", "You've been leaning forward for a while."),
        Channel::Lateral => ("Posture check", "You've been leaning to one side for a while."),
    };
    let _ = state;
    NotificationPayload {
        title: title.to_string(),
        message: message.to_string(),
        actions: vec![
            NotificationAction { id: "done".to_string(), label: "Done".to_string() },
            NotificationAction { id: "snooze".to_string(), label: "Snooze 15m".to_string() },
            NotificationAction { id: "dismiss".to_string(), label: "Dismiss".to_string() },
        ],
    }
}

/// A candidate nudge presented to the policy for a decision (§4.E).
#[derive(Debug, Clone)]
pub struct NudgeCandidate {
    pub now: f64,
    pub channel: Channel,
    pub to_state: PostureState,
    pub metric_value: f32,
    /// Effective threshold for this channel, already inflated by any active
    /// dismiss-backoff delta (gate 5 re-checks against this).
    pub elevated_threshold: f32,
    pub high_severity: bool,
    pub reason: String,
}

impl NudgeCandidate {
    pub fn from_transition(transition: &Transition, elevated_threshold: f32) -> Option<Self> {
        let channel = transition.channel?;
        if !transition.to.is_issue() {
            return None;
        }
        let metric_value = match (channel, transition.metric) {
            (Channel::Neck, Some(m)) => m.neck_deg,
            (Channel::Torso, Some(m)) => m.torso_deg,
            (Channel::Lateral, Some(m)) => m.lateral.abs(),
            _ => return None,
        };
        Some(Self {
            now: transition.ts,
            channel,
            to_state: transition.to,
            metric_value,
            elevated_threshold,
            high_severity: transition.high_severity,
            reason: transition.reason(None),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Delivered(NotificationPayload),
    Suppressed(GateReason),
    QueuedUnderDnd,
    ExpiredUnderDnd,
}

struct QueuedNudge {
    channel: Channel,
    to_state: PostureState,
    enqueued_at: f64,
    expires_at: f64,
}

fn channel_index(channel: Channel) -> usize {
    match channel {
        Channel::Neck => 0,
        Channel::Torso => 1,
        Channel::Lateral => 2,
    }
}

/// Wholly in-memory notification policy state (§3), reset every daemon start.
pub struct NotificationPolicy {
    cfg: NotificationCfg,
    cooldown_until: f64,
    snooze_until: f64,
    dismiss_backoff_until: f64,
    per_state_last_nudge_at: [f64; 3],
    active_notification_at: Option<f64>,
    dnd_queue: [Option<QueuedNudge>; 3],
}

/// Read-only snapshot for the status bus (§4.E).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PolicyStatus {
    pub cooldown_remaining_sec: f64,
    pub snooze_remaining_sec: f64,
    pub backoff_remaining_sec: f64,
    pub queue_depth: usize,
    pub last_nudge_age_sec: Option<f64>,
}

impl NotificationPolicy {
    pub fn new(cfg: NotificationCfg) -> Self {
        Self {
            cfg,
            cooldown_until: f64::NEG_INFINITY,
            snooze_until: f64::NEG_INFINITY,
            dismiss_backoff_until: f64::NEG_INFINITY,
            per_state_last_nudge_at: [f64::NEG_INFINITY; 3],
            active_notification_at: None,
            dnd_queue: [None, None, None],
        }
    }

    /// Reconfigure gating parameters; takes effect on the next decision.
    pub fn reconfigure(&mut self, cfg: NotificationCfg) {
        self.cfg = cfg;
    }

    /// Per-channel threshold inflation while a dismiss-backoff is active.
    pub fn active_backoff_deltas(&self, now: f64) -> BackoffDeltas {
        if now < self.dismiss_backoff_until {
            BackoffDeltas {
                neck_deg: self.cfg.dismiss_backoff_delta_deg,
                torso_deg: self.cfg.dismiss_backoff_delta_deg,
                lateral_cm: self.cfg.dismiss_backoff_delta_cm,
            }
        } else {
            BackoffDeltas::default()
        }
    }

    fn active_notification_locked(&self, now: f64) -> bool {
        match self.active_notification_at {
            Some(at) => now - at < self.cfg.active_notification_timeout_sec,
            None => false,
        }
    }

    /// Apply the five ordered gates, then dispatch against DND state.
    pub fn decide(&mut self, candidate: NudgeCandidate, dnd_active: bool) -> Decision {
        if let Some(reason) = self.first_failing_gate(&candidate) {
            return Decision::Suppressed(reason);
        }

        if dnd_active && self.cfg.respect_dnd {
            self.enqueue(&candidate);
            return Decision::QueuedUnderDnd;
        }

        self.mark_delivered(&candidate);
        Decision::Delivered(payload_for(candidate.channel, candidate.to_state))
    }

    fn first_failing_gate(&self, candidate: &NudgeCandidate) -> Option<GateReason> {
        let now = candidate.now;
        if self.cfg.cooldowns_enabled {
            if now < self.cooldown_until {
                return Some(GateReason::Cooldown);
            }
            if now < self.snooze_until {
                return Some(GateReason::Snooze);
            }
        }
        if self.active_notification_locked(now) {
            return Some(GateReason::ActiveNotification);
        }

        let idx = channel_index(candidate.channel);
        let since_last = now - self.per_state_last_nudge_at[idx];
        let dedupe_bypassed = candidate.high_severity && self.cfg.high_severity_bypass_dedupe;
        if since_last < self.cfg.dedupe_window_sec && !dedupe_bypassed {
            return Some(GateReason::Dedupe);
        }

        if now < self.dismiss_backoff_until && candidate.metric_value < candidate.elevated_threshold {
            return Some(GateReason::BelowBackoffThreshold);
        }

        None
    }

    fn mark_delivered(&mut self, candidate: &NudgeCandidate) {
        let idx = channel_index(candidate.channel);
        self.per_state_last_nudge_at[idx] = candidate.now;
        self.active_notification_at = Some(candidate.now);
    }

    fn enqueue(&mut self, candidate: &NudgeCandidate) {
        let idx = channel_index(candidate.channel);
        self.dnd_queue[idx] = Some(QueuedNudge {
            channel: candidate.channel,
            to_state: candidate.to_state,
            enqueued_at: candidate.now,
            expires_at: candidate.now + self.cfg.dnd_queue_expiry_sec,
        });
    }

    /// Result of servicing one queued entry. `current_metric` gives the
    /// caller's live `(metric_value, elevated_threshold)` for a channel, so
    /// a replayed nudge is re-checked against current state (spec §4.E)
    /// rather than against fabricated values that could never trip a gate.
    pub fn service_dnd_queue(
        &mut self,
        now: f64,
        dnd_active: bool,
        current_metric: impl Fn(Channel) -> (f32, f32),
    ) -> Vec<(Channel, Decision)> {
        let mut results = Vec::new();
        for idx in 0..3 {
            let Some(entry) = self.dnd_queue[idx].take() else {
                continue;
            };
            if now >= entry.expires_at {
                results.push((entry.channel, Decision::ExpiredUnderDnd));
                continue;
            }
            if dnd_active {
                self.dnd_queue[idx] = Some(entry);
                continue;
            }
            let (metric_value, elevated_threshold) = current_metric(entry.channel);
            let candidate = NudgeCandidate {
                now,
                channel: entry.channel,
                to_state: entry.to_state,
                metric_value,
                elevated_threshold,
                high_severity: false,
                reason: "dnd_queue_replay".to_string(),
            };
            match self.first_failing_gate(&candidate) {
                Some(reason) => results.push((entry.channel, Decision::Suppressed(reason))),
                None => {
                    self.mark_delivered(&candidate);
                    results.push((
                        entry.channel,
                        Decision::Delivered(payload_for(entry.channel, entry.to_state)),
                    ));
                }
            }
        }
        results
    }

    pub fn record_done(&mut self, now: f64) {
        self.cooldown_until = now + self.cfg.cooldown_done_sec;
        self.active_notification_at = None;
    }

    pub fn record_snooze(&mut self, now: f64) {
        self.snooze_until = now + self.cfg.cooldown_snooze_sec;
        self.active_notification_at = None;
    }

    pub fn record_dismiss(&mut self, now: f64) {
        self.dismiss_backoff_until = now + self.cfg.dismiss_backoff_duration_sec;
        self.active_notification_at = None;
    }

    pub fn status(&self, now: f64) -> PolicyStatus {
        PolicyStatus {
            cooldown_remaining_sec: (self.cooldown_until - now).max(0.0),
            snooze_remaining_sec: (self.snooze_until - now).max(0.0),
            backoff_remaining_sec: (self.dismiss_backoff_until - now).max(0.0),
            queue_depth: self.dnd_queue.iter().filter(|e| e.is_some()).count(),
            last_nudge_age_sec: self
                .per_state_last_nudge_at
                .iter()
                .copied()
                .filter(|t| t.is_finite())
                .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |best| best.max(t))))
                .map(|most_recent| now - most_recent),
        }
    }
}
