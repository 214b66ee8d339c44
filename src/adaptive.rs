use crate::metrics::MetricsSnapshot;
use std::time::Duration;

pub const SPAWN_INTERVAL_START: Duration = Duration::from_millis(2000);
pub const SPAWN_INTERVAL_MIN: Duration = Duration::from_millis(800);
pub const SPAWN_INTERVAL_MAX: Duration = Duration::from_millis(3000);

pub const LIFETIME_START: Duration = Duration::from_millis(3000);
pub const LIFETIME_MIN: Duration = Duration::from_millis(2000);
pub const LIFETIME_MAX: Duration = Duration::from_millis(4000);

/// Pacing is reviewed once per this many spawned targets.
pub const REVIEW_EVERY_TARGETS: u32 = 10;

const TIGHTEN_ACCURACY: f64 = 85.0;
const TIGHTEN_MEAN_RT_MS: f64 = 600.0;
const LOOSEN_ACCURACY: f64 = 60.0;

/// Current pacing parameters plus the difficulty tier. Only `review`
/// mutates these, so a raw user event can never retune the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub spawn_interval: Duration,
    pub stimulus_lifetime: Duration,
    pub level: u32,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            spawn_interval: SPAWN_INTERVAL_START,
            stimulus_lifetime: LIFETIME_START,
            level: 1,
        }
    }
}

impl Pacing {
    /// Retune from recent performance. Good accuracy with quick responses
    /// tightens the pacing and bumps the level; poor accuracy loosens it.
    /// The level never goes back down.
    pub fn review(&mut self, metrics: &MetricsSnapshot) {
        if metrics.accuracy > TIGHTEN_ACCURACY && metrics.mean_reaction_ms < TIGHTEN_MEAN_RT_MS {
            self.spawn_interval =
                (self.spawn_interval.saturating_sub(Duration::from_millis(100))).max(SPAWN_INTERVAL_MIN);
            self.stimulus_lifetime =
                (self.stimulus_lifetime.saturating_sub(Duration::from_millis(200))).max(LIFETIME_MIN);
            self.level += 1;
        } else if metrics.accuracy < LOOSEN_ACCURACY {
            self.spawn_interval =
                (self.spawn_interval + Duration::from_millis(200)).min(SPAWN_INTERVAL_MAX);
            self.stimulus_lifetime =
                (self.stimulus_lifetime + Duration::from_millis(300)).min(LIFETIME_MAX);
        }
    }
}
