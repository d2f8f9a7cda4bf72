//! Reference preset defaults from §4.D's table.
use crate::{ChannelTuning, Policy};

/// Build the default `Policy` for a named sensitivity preset.
pub fn policy_for(preset: crate::SensitivityPreset) -> Policy {
    use crate::SensitivityPreset::*;
    match preset {
        Sensitive => Policy {
            neck: ChannelTuning {
                delta_deg: 8.0,
                window_sec: 30.0,
                cumulative_min_sec: 18.0,
            },
            torso: ChannelTuning {
                delta_deg: 8.0,
                window_sec: 30.0,
                cumulative_min_sec: 18.0,
            },
            lateral: ChannelTuning {
                delta_deg: 3.0, // cm, see `delta_lateral_cm`
                window_sec: 40.0,
                cumulative_min_sec: 24.0,
            },
            majority_fraction: 0.60,
            gap_budget_sec: 3.0,
            high_severity_delta_deg: 20.0,
            high_severity_window_sec: 8.0,
            recovery_window_sec: 12.0,
            drift_alpha: 0.0,
            confidence_threshold: 0.5,
        },
        Standard => Policy {
            neck: ChannelTuning {
                delta_deg: 10.0,
                window_sec: 35.0,
                cumulative_min_sec: 23.0,
            },
            torso: ChannelTuning {
                delta_deg: 10.0,
                window_sec: 35.0,
                cumulative_min_sec: 23.0,
            },
            lateral: ChannelTuning {
                delta_deg: 3.5,
                window_sec: 45.0,
                cumulative_min_sec: 29.0,
            },
            majority_fraction: 0.65,
            gap_budget_sec: 3.0,
            high_severity_delta_deg: 20.0,
            high_severity_window_sec: 8.0,
            recovery_window_sec: 12.0,
            drift_alpha: 0.0,
            confidence_threshold: 0.5,
        },
        Conservative => Policy {
            neck: ChannelTuning {
                delta_deg: 12.0,
                window_sec: 40.0,
                cumulative_min_sec: 28.0,
            },
            torso: ChannelTuning {
                delta_deg: 12.0,
                window_sec: 40.0,
                cumulative_min_sec: 28.0,
            },
            lateral: ChannelTuning {
                delta_deg: 4.0,
                window_sec: 50.0,
                cumulative_min_sec: 35.0,
            },
            majority_fraction: 0.70,
            gap_budget_sec: 2.0,
            high_severity_delta_deg: 20.0,
            high_severity_window_sec: 8.0,
            recovery_window_sec: 12.0,
            drift_alpha: 0.0,
            confidence_threshold: 0.5,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SensitivityPreset;

    #[test]
    fn sensitive_matches_table() {
        let p = policy_for(SensitivityPreset::Sensitive);
        assert_eq!(p.neck.delta_deg, 8.0);
        assert_eq!(p.lateral.window_sec, 40.0);
        assert_eq!(p.majority_fraction, 0.60);
        assert_eq!(p.gap_budget_sec, 3.0);
        assert_eq!(p.neck.cumulative_min_sec, 18.0);
    }

    #[test]
    fn conservative_matches_table() {
        let p = policy_for(SensitivityPreset::Conservative);
        assert_eq!(p.neck.delta_deg, 12.0);
        assert_eq!(p.majority_fraction, 0.70);
        assert_eq!(p.gap_budget_sec, 2.0);
    }
}
