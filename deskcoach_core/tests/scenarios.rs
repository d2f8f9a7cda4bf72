//! End-to-end scenarios, literal from the notification policy's gating
//! table and the posture state machine's detection paths.
use deskcoach_config::{presets, NotificationCfg, SensitivityPreset};
use deskcoach_core::policy::{Decision, NotificationPolicy, NudgeCandidate};
use deskcoach_core::state_machine::{Channel, PostureState, StateMachine};
use deskcoach_core::Baseline;
use deskcoach_core::metrics::MetricSample;

fn baseline(neck0: f32, torso0: f32, lateral0: f32) -> Baseline {
    Baseline {
        neck0,
        torso0,
        lateral0,
        shoulder_width_proxy: 0.2,
        calibrated_at: 0.0,
        sample_count: 100,
        conf_mean: 0.9,
        version: 1,
    }
}

fn sample(ts: f64, neck: f32, torso: f32, lateral: f32, conf: f32) -> MetricSample {
    MetricSample { ts, neck_deg: neck, torso_deg: torso, lateral, conf }
}

/// Scenario 1: sustained slouch, majority/cumulative sums stay coupled for
/// the Sensitive preset (window_sec=30, majority_fraction=0.6,
/// cumulative_min_sec=18 => both trip at the same accumulated-above total);
/// either detection path firing GOOD -> SLOUCH within the window is correct.
#[test]
fn sustained_slouch_fires_within_window() {
    let policy = presets::policy_for(SensitivityPreset::Sensitive);
    let mut sm = StateMachine::new(baseline(8.4, 0.0, 0.02), 0.0, policy.recovery_window_sec as f64);
    sm.tick(0.0, Some(sample(0.0, 8.4, 0.0, 0.0, 0.9)), &policy); // exit paused

    let mut fired_at = None;
    let mut t = 0.125_f64;
    while t <= 30.0 {
        // longest below-run stays <=3s: one below tick every 8th step (~1s apart)
        let above = (t / 0.125) as u32 % 8 != 0;
        let neck = if above { 19.5 } else { 15.0 };
        let outcome = sm.tick(t, Some(sample(t, neck, 0.0, 0.0, 0.67)), &policy);
        if let Some(tr) = outcome.transition {
            assert_eq!(tr.to, PostureState::Slouch);
            assert_eq!(tr.channel, Some(Channel::Neck));
            fired_at = Some(t);
            break;
        }
        t += 0.125;
    }
    assert!(fired_at.is_some(), "expected GOOD -> SLOUCH within 30s");
    assert!(fired_at.unwrap() <= 30.5);
}

/// Scenario 2: intermittent slouch, cumulative path. Baseline `neck0=2.5°`,
/// Sensitive preset (effective threshold 10.5°). Alternating 2s above
/// (neck=12°) / 2s below (neck=6°) keeps `above_fraction` pinned near 0.5
/// (below the 0.60 majority bar) and, over the 30s window, `cumulative`
/// stays under its 18s floor too: no transition by t=30s. Continuing the
/// same pattern to t=40s lets cumulative clear 18s, entering SLOUCH via the
/// cumulative path rather than majority.
#[test]
fn intermittent_slouch_fires_on_cumulative_path_only_after_extension() {
    let policy = presets::policy_for(SensitivityPreset::Sensitive);
    let mut sm = StateMachine::new(baseline(2.5, 0.0, 0.0), 0.0, policy.recovery_window_sec as f64);
    sm.tick(0.0, Some(sample(0.0, 2.5, 0.0, 0.0, 0.9)), &policy); // exit paused

    let mut fired_at = None;
    let mut t = 0.25_f64;
    while t <= 40.0 {
        let cycle_pos = t % 4.0;
        let neck = if cycle_pos < 2.0 { 12.0 } else { 6.0 };
        let outcome = sm.tick(t, Some(sample(t, neck, 0.0, 0.0, 0.9)), &policy);
        if let Some(tr) = outcome.transition {
            assert!(t > 30.0, "transition fired too early at t={t}, before cumulative floor is reachable");
            assert_eq!(tr.to, PostureState::Slouch);
            assert_eq!(tr.channel, Some(Channel::Neck));
            fired_at = Some(t);
            break;
        }
        if t <= 30.0 {
            assert_eq!(sm.state(), PostureState::Good, "no transition expected before t=30 (t={t})");
        }
        t += 0.25;
    }
    assert!(fired_at.is_some(), "expected cumulative-path SLOUCH once the pattern extends past 30s");
}

/// Scenario 3: high-severity shortcut bypasses majority/cumulative entirely.
#[test]
fn high_severity_shortcut_fires_before_window_fills() {
    let mut policy = presets::policy_for(SensitivityPreset::Sensitive);
    policy.torso.window_sec = 30.0; // majority/cumulative would need much longer than 8.5s
    policy.torso.cumulative_min_sec = 18.0;
    let mut sm = StateMachine::new(baseline(0.0, 0.0, 0.0), 0.0, policy.recovery_window_sec as f64);
    sm.tick(0.0, Some(sample(0.0, 0.0, 0.0, 0.0, 0.9)), &policy);

    // Effective threshold stacks the high-severity delta on top of the
    // channel's normal effective threshold (baseline 0 + delta_deg 8 + 20),
    // so the fed value must clear 28 deg, not just baseline + 20.
    let mut fired_at = None;
    let mut t = 0.25_f64;
    while t <= 8.5 {
        let outcome = sm.tick(t, Some(sample(t, 0.0, 30.0, 0.0, 0.9)), &policy);
        if let Some(tr) = outcome.transition {
            assert_eq!(tr.to, PostureState::ForwardLean);
            assert!(tr.high_severity);
            fired_at = Some(t);
            break;
        }
        t += 0.25;
    }
    let fired_at = fired_at.expect("expected high-severity FORWARD_LEAN transition by t=8.5");
    assert!(fired_at <= 8.6, "fired too late: {fired_at}");
}

/// Scenario 4: snooze suppresses a repeat nudge until it expires, then the
/// next transition on the same channel nudges again.
#[test]
fn snooze_suppresses_then_expires() {
    let mut policy = NotificationPolicy::new(NotificationCfg::default());
    policy.record_snooze(5.0); // snooze_until = 5 + 900 = 905

    let during = NudgeCandidate { now: 300.0, ..candidate_like(Channel::Neck) };
    assert_eq!(policy.decide(during, false), Decision::Suppressed(deskcoach_core::GateReason::Snooze));

    let after = NudgeCandidate { now: 910.0, ..candidate_like(Channel::Neck) };
    assert!(matches!(policy.decide(after, false), Decision::Delivered(_)));
}

fn candidate_like(channel: Channel) -> NudgeCandidate {
    NudgeCandidate {
        now: 0.0,
        channel,
        to_state: channel.issue_state(),
        metric_value: 20.0,
        elevated_threshold: 16.4,
        high_severity: false,
        reason: "majority".to_string(),
    }
}

/// Scenario 5: dismiss backoff suppresses a metric that stays below the
/// inflated threshold, then delivers once it clears it.
#[test]
fn dismiss_backoff_then_clears() {
    let mut policy = NotificationPolicy::new(NotificationCfg::default());
    policy.record_dismiss(0.0);

    let below = NudgeCandidate {
        now: 300.0,
        channel: Channel::Neck,
        to_state: PostureState::Slouch,
        metric_value: 20.0,
        elevated_threshold: 21.4,
        high_severity: false,
        reason: "majority on neck".to_string(),
    };
    assert_eq!(
        policy.decide(below, false),
        Decision::Suppressed(deskcoach_core::GateReason::BelowBackoffThreshold)
    );

    let above = NudgeCandidate {
        now: 600.0,
        channel: Channel::Neck,
        to_state: PostureState::Slouch,
        metric_value: 22.0,
        elevated_threshold: 21.4,
        high_severity: false,
        reason: "majority on neck".to_string(),
    };
    assert!(matches!(policy.decide(above, false), Decision::Delivered(_)));
}

/// Scenario 6: a nudge queued under DND is delivered once DND clears, but
/// expires untouched if DND outlasts the queue's expiry window.
#[test]
fn dnd_queue_delivers_after_dnd_clears_or_expires() {
    let mut delivered = NotificationPolicy::new(NotificationCfg::default());
    let queued = delivered.decide(candidate_like(Channel::Neck), true);
    assert_eq!(queued, Decision::QueuedUnderDnd);
    let results = delivered.service_dnd_queue(600.0, false, |_| (20.0, 16.4));
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0].1, Decision::Delivered(_)));

    let mut expires = NotificationPolicy::new(NotificationCfg::default());
    expires.decide(candidate_like(Channel::Torso), true);
    let results = expires.service_dnd_queue(2800.0, true, |_| (20.0, 16.4));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1, Decision::ExpiredUnderDnd);
}
