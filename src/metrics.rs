use serde::{Deserialize, Serialize};
use std::time::Duration;

pub fn mean(data: &[f64]) -> Option<f64> {
    let count = data.len();
    match count {
        positive if positive > 0 => Some(data.iter().sum::<f64>() / count as f64),
        _ => None,
    }
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    match (mean(data), data.len()) {
        (Some(data_mean), count) if count > 0 => {
            let variance = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;
                    diff * diff
                })
                .sum::<f64>()
                / count as f64;
            Some(variance.sqrt())
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum_macros::Display)]
pub enum AttentionLevel {
    Excellent,
    Good,
    Fair,
    #[strum(serialize = "Needs Improvement")]
    NeedsImprovement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum_macros::Display)]
pub enum ImpulseControl {
    Perfect,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum_macros::Display)]
pub enum RiskLevel {
    #[strum(serialize = "Low Risk")]
    Low,
    #[strum(serialize = "Moderate Risk")]
    Moderate,
    #[strum(serialize = "High Risk")]
    High,
}

/// Raw counters and samples the engine derives from. The session exposes
/// this view of itself; keeping the engine off the session struct keeps the
/// derivations pure and trivially testable.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCounts<'a> {
    pub correct_hits: u32,
    pub missed_targets: u32,
    pub false_alarms: u32,
    pub targets_spawned: u32,
    pub distractors_spawned: u32,
    pub reaction_times: &'a [Duration],
}

/// Derived metrics at one point in time. Every field is recomputed from the
/// raw counts on each call; nothing here is cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub accuracy: f64,
    pub mean_reaction_ms: f64,
    pub reaction_variability_ms: f64,
    pub miss_rate: f64,
    pub false_alarm_rate: f64,
    pub attention_score: f64,
    pub attention_level: AttentionLevel,
    pub impulse_control: ImpulseControl,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        derive(RawCounts::default())
    }
}

/// Risk contributions from reaction variability only kick in once there is
/// a meaningful sample size.
const VARIABILITY_MIN_SAMPLES: usize = 6;

pub fn derive(raw: RawCounts<'_>) -> MetricsSnapshot {
    let responses = raw.correct_hits + raw.false_alarms;
    // Zero denominators resolve to neutral defaults, not NaN.
    let accuracy = if responses > 0 {
        raw.correct_hits as f64 / responses as f64 * 100.0
    } else {
        100.0
    };

    let rt_ms: Vec<f64> = raw
        .reaction_times
        .iter()
        .map(|rt| rt.as_secs_f64() * 1000.0)
        .collect();
    let mean_reaction_ms = mean(&rt_ms).unwrap_or(0.0);
    let reaction_variability_ms = if rt_ms.len() < 2 {
        0.0
    } else {
        std_dev(&rt_ms).unwrap_or(0.0)
    };

    let miss_rate = if raw.targets_spawned > 0 {
        raw.missed_targets as f64 / raw.targets_spawned as f64 * 100.0
    } else {
        0.0
    };
    let false_alarm_rate = if raw.distractors_spawned > 0 {
        raw.false_alarms as f64 / raw.distractors_spawned as f64 * 100.0
    } else {
        0.0
    };

    let attention_score = (100.0 - miss_rate - false_alarm_rate).clamp(0.0, 100.0);
    let attention_level = if attention_score >= 90.0 {
        AttentionLevel::Excellent
    } else if attention_score >= 75.0 {
        AttentionLevel::Good
    } else if attention_score >= 60.0 {
        AttentionLevel::Fair
    } else {
        AttentionLevel::NeedsImprovement
    };

    let impulse_control = if false_alarm_rate > 25.0 {
        ImpulseControl::Poor
    } else if false_alarm_rate > 15.0 {
        ImpulseControl::Fair
    } else if false_alarm_rate > 5.0 {
        ImpulseControl::Good
    } else {
        ImpulseControl::Perfect
    };

    let mut risk_score = 0u32;

    // Sustained-attention lapses
    if miss_rate > 30.0 {
        risk_score += 3;
    } else if miss_rate > 15.0 {
        risk_score += 2;
    } else if miss_rate > 5.0 {
        risk_score += 1;
    }

    // Impulse-control lapses
    if false_alarm_rate > 25.0 {
        risk_score += 3;
    } else if false_alarm_rate > 15.0 {
        risk_score += 2;
    } else if false_alarm_rate > 5.0 {
        risk_score += 1;
    }

    // Inconsistent responding
    if rt_ms.len() >= VARIABILITY_MIN_SAMPLES {
        if reaction_variability_ms > 300.0 {
            risk_score += 2;
        } else if reaction_variability_ms > 200.0 {
            risk_score += 1;
        }
    }

    if accuracy < 70.0 {
        risk_score += 2;
    } else if accuracy < 80.0 {
        risk_score += 1;
    }

    let risk_level = if risk_score >= 6 {
        RiskLevel::High
    } else if risk_score >= 3 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    };

    MetricsSnapshot {
        accuracy,
        mean_reaction_ms,
        reaction_variability_ms,
        miss_rate,
        false_alarm_rate,
        attention_score,
        attention_level,
        impulse_control,
        risk_score,
        risk_level,
    }
}
