//! Component C: condition windows — rolling `(ts, above)` history per channel
//! with majority/cumulative/gap statistics.
use std::collections::VecDeque;

use serde::Serialize;

/// Derived statistics over a window's current contents at a given query time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    /// `Σ duration_above / window_sec`, in `[0, 1]`.
    pub above_fraction: f32,
    /// `Σ duration_above`, unclipped by the fraction normalization.
    pub cumulative_above_sec: f32,
    /// Longest contiguous run of `above = false` inside the window.
    pub max_gap_sec: f32,
}

/// A bounded, time-indexed sequence of `(ts, above)` entries for one channel.
///
/// Entries are retained up to `retain_sec` behind the most recent insert;
/// `stats` can be queried with any `window_sec <= retain_sec` (the detection
/// window and the narrower recovery window share the same entry history).
#[derive(Debug, Clone)]
pub struct ConditionWindow {
    retain_sec: f64,
    entries: VecDeque<(f64, bool)>,
}

impl ConditionWindow {
    pub fn new(retain_sec: f64) -> Self {
        Self {
            retain_sec,
            entries: VecDeque::new(),
        }
    }

    /// Insert one `(ts, above)` observation. `ts` must be monotonically
    /// non-decreasing across calls. Entries older than `ts - retain_sec` are
    /// evicted.
    pub fn push(&mut self, ts: f64, above: bool) {
        self.entries.push_back((ts, above));
        let cutoff = ts - self.retain_sec;
        while let Some(&(front_ts, _)) = self.entries.front() {
            if front_ts < cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Clear all entries. Called on every state transition so the condition
    /// that just fired cannot immediately re-fire.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The retention horizon this window was constructed with.
    pub fn retain_sec(&self) -> f64 {
        self.retain_sec
    }

    /// Compute majority/cumulative/gap statistics over `[now - window_sec,
    /// now]`. The gap before the first entry (or the whole window, if empty)
    /// counts as "below" — freshly cleared windows must not appear to have
    /// positive evidence.
    pub fn stats(&self, now: f64, window_sec: f64) -> WindowStats {
        let start = now - window_sec;
        if window_sec <= 0.0 {
            return WindowStats {
                above_fraction: 0.0,
                cumulative_above_sec: 0.0,
                max_gap_sec: 0.0,
            };
        }

        let mut above_sum = 0.0_f64;
        let mut below_run = 0.0_f64;
        let mut max_gap = 0.0_f64;

        let mut cursor = start;
        for (i, &(ts, above)) in self.entries.iter().enumerate() {
            let span_start = ts.max(start);
            let span_end = self
                .entries
                .get(i + 1)
                .map(|&(next_ts, _)| next_ts)
                .unwrap_or(now)
                .min(now);

            if span_start > cursor {
                // Gap before this entry's data (or between window start and
                // the first entry): no evidence, treated as "below".
                below_run += span_start - cursor;
                max_gap = max_gap.max(below_run);
            }
            cursor = span_start.max(cursor);

            let duration = (span_end - span_start).max(0.0);
            if duration > 0.0 {
                if above {
                    above_sum += duration;
                    below_run = 0.0;
                } else {
                    below_run += duration;
                    max_gap = max_gap.max(below_run);
                }
                cursor = span_end;
            }
        }
        if cursor < now {
            below_run += now - cursor;
            max_gap = max_gap.max(below_run);
        }

        WindowStats {
            above_fraction: ((above_sum / window_sec) as f32).clamp(0.0, 1.0),
            cumulative_above_sec: above_sum as f32,
            max_gap_sec: max_gap as f32,
        }
    }
}
