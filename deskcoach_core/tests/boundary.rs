//! Boundary behaviors (§8): exact-equality cases for the gap budget and the
//! cumulative threshold.
use deskcoach_core::windows::ConditionWindow;
use rstest::rstest;

/// A run of `above=true` with one gap right at the gap budget must still
/// register as a small enough gap to satisfy `max_gap_sec <= gap_budget`;
/// one epsilon past it must not.
#[rstest]
#[case(3.0, true)] // gap == gap_budget_sec: majority-eligible
#[case(3.001, false)] // gap just over budget: not majority-eligible
fn gap_budget_boundary(#[case] gap_sec: f64, #[case] within_budget: bool) {
    let gap_budget_sec = 3.0;
    let mut w = ConditionWindow::new(60.0);
    w.push(0.0, true);
    w.push(20.0, false);
    w.push(20.0 + gap_sec, true);
    let stats = w.stats(40.0, 40.0);
    assert_eq!(stats.max_gap_sec <= gap_budget_sec as f32, within_budget);
}

/// `cumulative_above_sec` equal to `cumulative_min_sec` triggers; one tick
/// less does not.
#[rstest]
#[case(18.0, true)]
#[case(17.9, false)]
fn cumulative_threshold_boundary(#[case] above_sec: f64, #[case] meets_threshold: bool) {
    let cumulative_min_sec = 18.0;
    let mut w = ConditionWindow::new(60.0);
    w.push(0.0, true);
    w.push(above_sec, false);
    let stats = w.stats(30.0, 30.0);
    assert_eq!(stats.cumulative_above_sec as f64 >= cumulative_min_sec, meets_threshold);
}

/// The recovery transition occurs when `above_fraction < (1 - majority_fraction)`;
/// at equality it does not.
#[rstest]
#[case(0.40, false)] // exactly at (1 - 0.60): does not recover
#[case(0.399, true)] // just under: recovers
fn recovery_boundary(#[case] above_fraction_target: f64, #[case] recovers: bool) {
    let majority_fraction = 0.60_f64;
    let mut w = ConditionWindow::new(60.0);
    // 30s window; push `above` for `above_fraction_target * 30` seconds, then
    // `below` for the remainder, ending exactly at t=30.
    let above_sec = above_fraction_target * 30.0;
    w.push(0.0, true);
    w.push(above_sec, false);
    let stats = w.stats(30.0, 30.0);
    assert_eq!((stats.above_fraction as f64) < (1.0 - majority_fraction), recovers);
}
