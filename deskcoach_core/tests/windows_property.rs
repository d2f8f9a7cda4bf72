//! Property-based invariants over `ConditionWindow::stats` (§8): for all
//! window contents and query times, `above_fraction` stays in `[0,1]` and
//! `cumulative_above_sec` never exceeds the query window.
use deskcoach_core::windows::ConditionWindow;
use proptest::prelude::*;

proptest! {
    #[test]
    fn stats_stay_in_bounds(
        entries in prop::collection::vec((0.0_f64..500.0, any::<bool>()), 0..200),
        window_sec in 1.0_f64..120.0,
    ) {
        let mut sorted = entries;
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        let mut window = ConditionWindow::new(600.0);
        let mut last_ts = f64::NEG_INFINITY;
        for (ts, above) in sorted {
            let ts = ts.max(last_ts); // preserve monotonic non-decreasing contract
            window.push(ts, above);
            last_ts = ts;
        }

        let now = last_ts.max(0.0) + 50.0;
        let stats = window.stats(now, window_sec);
        prop_assert!(stats.above_fraction >= 0.0 && stats.above_fraction <= 1.0);
        prop_assert!(stats.cumulative_above_sec >= 0.0);
        prop_assert!(stats.cumulative_above_sec as f64 <= window_sec + 1e-6);
        prop_assert!(stats.max_gap_sec >= 0.0);
        prop_assert!(stats.max_gap_sec as f64 <= window_sec + 1e-6);
    }

    #[test]
    fn clearing_always_yields_zero_evidence(window_sec in 1.0_f64..120.0, now in 0.0_f64..1000.0) {
        let mut window = ConditionWindow::new(600.0);
        window.push(now.max(0.0), true);
        window.clear();
        let stats = window.stats(now + window_sec, window_sec);
        prop_assert_eq!(stats.above_fraction, 0.0);
        prop_assert_eq!(stats.cumulative_above_sec, 0.0);
    }
}
