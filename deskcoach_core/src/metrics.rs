//! Component A: geometry extraction and smoothing.
//!
//! Turns one landmark frame into a `MetricSample` (neck/torso angles, lateral
//! lean, confidence), then smooths each channel with a first-order EMA and
//! keeps a bounded rolling history for diagnostics.
use std::collections::VecDeque;

use deskcoach_traits::{Landmark, LandmarkFrame};

// MediaPipe/BlazePose landmark indices.
const LEFT_SHOULDER: usize = 11;
const RIGHT_SHOULDER: usize = 12;
const LEFT_EAR: usize = 7;
const RIGHT_EAR: usize = 8;
const LEFT_HIP: usize = 23;
const RIGHT_HIP: usize = 24;

/// Minimum visibility a landmark must have to count as "present" for gating.
pub const DEFAULT_MIN_VISIBILITY: f32 = 0.5;

/// `{ts, neck_deg, torso_deg, lateral, conf}` — see data model §3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub ts: f64,
    pub neck_deg: f32,
    pub torso_deg: f32,
    pub lateral: f32,
    pub conf: f32,
}

/// Angle in degrees between the vector `from -> to` and the image-vertical
/// axis, in `[0, 90]`. Uses absolute component magnitudes so camera tilt
/// direction and which endpoint is "higher" don't affect the result.
fn angle_from_vertical_deg(from: (f32, f32), to: (f32, f32)) -> f32 {
    let dx = (to.0 - from.0).abs();
    let dy = (to.1 - from.1).abs();
    dx.atan2(dy).to_degrees()
}

fn midpoint(a: &Landmark, b: &Landmark) -> (f32, f32) {
    ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Extract a metric sample from one landmark frame, or `None` if too few of
/// the required landmarks (both shoulders, both hips, at least one ear) meet
/// `min_visibility`.
pub fn extract(
    frame: &LandmarkFrame,
    ts: f64,
    min_visibility: f32,
) -> Option<MetricSample> {
    let ls = &frame[LEFT_SHOULDER];
    let rs = &frame[RIGHT_SHOULDER];
    let lh = &frame[LEFT_HIP];
    let rh = &frame[RIGHT_HIP];
    let le = &frame[LEFT_EAR];
    let re = &frame[RIGHT_EAR];

    let best_ear_vis = le.visibility.max(re.visibility);
    let required_ok = ls.visibility >= min_visibility
        && rs.visibility >= min_visibility
        && lh.visibility >= min_visibility
        && rh.visibility >= min_visibility
        && best_ear_vis >= min_visibility;
    if !required_ok {
        return None;
    }

    let conf = ls
        .visibility
        .min(rs.visibility)
        .min(lh.visibility)
        .min(rh.visibility)
        .min(best_ear_vis);

    let shoulder_mid = midpoint(ls, rs);
    let hip_mid = midpoint(lh, rh);
    let ear_mid = if le.visibility >= min_visibility && re.visibility >= min_visibility {
        midpoint(le, re)
    } else if le.visibility >= re.visibility {
        (le.x, le.y)
    } else {
        (re.x, re.y)
    };

    let neck_deg = angle_from_vertical_deg(shoulder_mid, ear_mid);
    let torso_deg = angle_from_vertical_deg(hip_mid, shoulder_mid);

    let shoulder_width = (rs.x - ls.x).abs().max(f32::EPSILON);
    let lateral = (ls.y - rs.y) / shoulder_width;

    Some(MetricSample {
        ts,
        neck_deg,
        torso_deg,
        lateral,
        conf,
    })
}

/// Shoulder-width proxy used as the lateral-lean denominator and as the
/// calibration baseline's `shoulder_width_proxy`.
pub fn shoulder_width(frame: &LandmarkFrame) -> f32 {
    (frame[RIGHT_SHOULDER].x - frame[LEFT_SHOULDER].x)
        .abs()
        .max(f32::EPSILON)
}

/// First-order exponential moving average, α configurable in `[0.1, 0.5]`.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    alpha: f32,
    value: Option<f32>,
}

impl Ema {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.1, 0.5),
            value: None,
        }
    }

    /// Feed a new raw value, returning the updated smoothed value.
    pub fn update(&mut self, x: f32) -> f32 {
        let y = match self.value {
            Some(prev) => prev + self.alpha * (x - prev),
            None => x,
        };
        self.value = Some(y);
        y
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Per-channel smoothed state: one EMA per metric channel. Never persisted.
#[derive(Debug, Clone)]
pub struct Smoother {
    pub neck: Ema,
    pub torso: Ema,
    pub lateral: Ema,
}

impl Smoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            neck: Ema::new(alpha),
            torso: Ema::new(alpha),
            lateral: Ema::new(alpha),
        }
    }

    /// Smooth a raw sample, producing a sample with the same timestamp/conf
    /// but EMA-filtered channel values.
    pub fn update(&mut self, raw: &MetricSample) -> MetricSample {
        MetricSample {
            ts: raw.ts,
            neck_deg: self.neck.update(raw.neck_deg),
            torso_deg: self.torso.update(raw.torso_deg),
            lateral: self.lateral.update(raw.lateral),
            conf: raw.conf,
        }
    }
}

/// Bounded, time-ordered history of raw metric samples for one run, clipped
/// to a wall-clock window (default 60 s, configurable 30-120 s).
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    window_sec: f64,
    samples: VecDeque<MetricSample>,
}

impl RollingBuffer {
    pub fn new(window_sec: f64) -> Self {
        Self {
            window_sec: window_sec.clamp(30.0, 120.0),
            samples: VecDeque::new(),
        }
    }

    /// Insert a sample and evict anything older than `window_sec` before it.
    pub fn push(&mut self, sample: MetricSample) {
        self.samples.push_back(sample);
        let cutoff = sample.ts - self.window_sec;
        while let Some(front) = self.samples.front() {
            if front.ts < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSample> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(
        ls: f32,
        rs: f32,
        lh: f32,
        rh: f32,
        le: f32,
        re: f32,
    ) -> LandmarkFrame {
        let mut frame = [Landmark {
            x: 0.5,
            y: 0.5,
            visibility: 0.0,
        }; deskcoach_traits::LANDMARK_COUNT];
        frame[LEFT_SHOULDER] = Landmark { x: 0.4, y: 0.4, visibility: ls };
        frame[RIGHT_SHOULDER] = Landmark { x: 0.6, y: 0.4, visibility: rs };
        frame[LEFT_HIP] = Landmark { x: 0.45, y: 0.7, visibility: lh };
        frame[RIGHT_HIP] = Landmark { x: 0.55, y: 0.7, visibility: rh };
        frame[LEFT_EAR] = Landmark { x: 0.42, y: 0.2, visibility: le };
        frame[RIGHT_EAR] = Landmark { x: 0.58, y: 0.2, visibility: re };
        frame
    }

    #[test]
    fn upright_pose_yields_small_angles() {
        let frame = frame_with(0.9, 0.9, 0.9, 0.9, 0.9, 0.9);
        let sample = extract(&frame, 0.0, 0.5).expect("should extract");
        assert!(sample.neck_deg < 5.0, "neck_deg={}", sample.neck_deg);
        assert!(sample.torso_deg < 5.0, "torso_deg={}", sample.torso_deg);
        assert!(sample.conf >= 0.9);
    }

    #[test]
    fn low_visibility_required_landmark_yields_none() {
        let frame = frame_with(0.9, 0.1, 0.9, 0.9, 0.9, 0.9);
        assert!(extract(&frame, 0.0, 0.5).is_none());
    }

    #[test]
    fn one_visible_ear_is_sufficient() {
        let frame = frame_with(0.9, 0.9, 0.9, 0.9, 0.9, 0.0);
        assert!(extract(&frame, 0.0, 0.5).is_some());
    }

    #[test]
    fn ema_converges_toward_constant_input() {
        let mut ema = Ema::new(0.3);
        let mut y = 0.0;
        for _ in 0..50 {
            y = ema.update(10.0);
        }
        assert!((y - 10.0).abs() < 1e-6);
    }

    #[test]
    fn rolling_buffer_evicts_outside_window() {
        let mut buf = RollingBuffer::new(30.0);
        for i in 0..100 {
            buf.push(MetricSample {
                ts: i as f64,
                neck_deg: 0.0,
                torso_deg: 0.0,
                lateral: 0.0,
                conf: 1.0,
            });
        }
        assert!(buf.iter().all(|s| 99.0 - s.ts <= 30.0));
    }
}
