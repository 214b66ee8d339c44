use crate::adaptive::{Pacing, REVIEW_EVERY_TARGETS};
use crate::metrics::{self, MetricsSnapshot, RawCounts};
use crate::stimulus::{PlayArea, Position, Spawner, Stimulus, StimulusKind, HIT_RADIUS};
use std::time::{Duration, Instant};

/// Assessments auto-stop once this much running time has accumulated.
pub const MAX_SESSION: Duration = Duration::from_secs(300);

const BASE_POINTS: u32 = 100;
const FAST_BONUS: u32 = 50;
const FAST_BONUS_MS: u64 = 500;
const VERY_FAST_BONUS_MS: u64 = 300;
const STREAK_BONUS_STEP: u32 = 5;
const STREAK_BONUS_CAP: u32 = 50;
const FALSE_ALARM_PENALTY: u32 = 50;
const BACKGROUND_TAP_PENALTY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Running,
    Paused,
    Finished,
}

/// What a tap amounted to, for UI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    CorrectHit { points: u32 },
    FalseAlarm,
    BackgroundTap,
    Ignored,
}

/// One assessment run. All mutation goes through the command methods below,
/// each of which takes the current instant explicitly; anything arriving in
/// the wrong phase is a no-op.
#[derive(Debug)]
pub struct Session {
    pub phase: Phase,
    pub pacing: Pacing,
    pub active: Vec<Stimulus>,

    pub correct_hits: u32,
    pub missed_targets: u32,
    pub false_alarms: u32,
    pub targets_spawned: u32,
    pub distractors_spawned: u32,
    pub reaction_times: Vec<Duration>,

    pub score: u32,
    pub streak: u32,
    pub max_streak: u32,

    spawner: Spawner,
    next_id: u64,
    next_spawn_due: Option<Instant>,
    /// Running time folded in up to the last pause/stop.
    accum: Duration,
    resumed_at: Option<Instant>,
    paused_at: Option<Instant>,
}

impl Session {
    pub fn new(play_area: PlayArea) -> Self {
        Self::with_spawner(Spawner::new(play_area))
    }

    /// Deterministic stimulus stream, for tests and `--seed`.
    pub fn with_seed(play_area: PlayArea, seed: u64) -> Self {
        Self::with_spawner(Spawner::with_seed(play_area, seed))
    }

    fn with_spawner(spawner: Spawner) -> Self {
        Self {
            phase: Phase::NotStarted,
            pacing: Pacing::default(),
            active: Vec::new(),
            correct_hits: 0,
            missed_targets: 0,
            false_alarms: 0,
            targets_spawned: 0,
            distractors_spawned: 0,
            reaction_times: Vec::new(),
            score: 0,
            streak: 0,
            max_streak: 0,
            spawner,
            next_id: 0,
            next_spawn_due: None,
            accum: Duration::ZERO,
            resumed_at: None,
            paused_at: None,
        }
    }

    pub fn set_play_area(&mut self, play_area: PlayArea) {
        self.spawner.play_area = play_area;
    }

    pub fn play_area(&self) -> PlayArea {
        self.spawner.play_area
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Wall-clock running time, excluding paused intervals.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.phase, self.resumed_at) {
            (Phase::Running, Some(resumed_at)) => self.accum + (now - resumed_at),
            _ => self.accum,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.phase != Phase::NotStarted {
            return;
        }
        self.phase = Phase::Running;
        self.resumed_at = Some(now);
        self.next_spawn_due = Some(now + self.pacing.spawn_interval);
    }

    pub fn pause(&mut self, now: Instant) {
        if self.phase != Phase::Running {
            return;
        }
        if let Some(resumed_at) = self.resumed_at.take() {
            self.accum += now - resumed_at;
        }
        self.paused_at = Some(now);
        self.phase = Phase::Paused;
    }

    /// Resuming shifts every pending deadline forward by the paused
    /// duration, so a pause never burns stimulus lifetime or spawn cadence.
    pub fn resume(&mut self, now: Instant) {
        if self.phase != Phase::Paused {
            return;
        }
        let shift = self
            .paused_at
            .take()
            .map(|paused_at| now - paused_at)
            .unwrap_or_default();
        for stimulus in &mut self.active {
            stimulus.spawned_at += shift;
            stimulus.deadline += shift;
        }
        if let Some(due) = self.next_spawn_due.as_mut() {
            *due += shift;
        }
        self.resumed_at = Some(now);
        self.phase = Phase::Running;
    }

    pub fn stop(&mut self, now: Instant) {
        match self.phase {
            Phase::Running => {
                if let Some(resumed_at) = self.resumed_at.take() {
                    self.accum += now - resumed_at;
                }
            }
            Phase::Paused => {
                self.paused_at = None;
            }
            _ => return,
        }
        self.active.clear();
        self.next_spawn_due = None;
        self.phase = Phase::Finished;
    }

    /// Advance the session to `now`: expire overdue stimuli, spawn when the
    /// cadence is due, and auto-stop once the assessment window is spent.
    /// A no-op outside Running, so stale ticks are harmless.
    pub fn on_tick(&mut self, now: Instant) {
        if self.phase != Phase::Running {
            return;
        }

        self.expire_overdue(now);

        if let Some(due) = self.next_spawn_due {
            if now >= due {
                self.spawn(now);
                self.next_spawn_due = Some(now + self.pacing.spawn_interval);
            }
        }

        if self.elapsed(now) > MAX_SESSION {
            self.stop(now);
        }
    }

    fn expire_overdue(&mut self, now: Instant) {
        let mut missed = 0u32;
        self.active.retain(|stimulus| {
            if now < stimulus.deadline {
                return true;
            }
            if stimulus.is_target() {
                missed += 1;
            }
            // Ignoring a distractor is the desired behavior; expiry is silent.
            false
        });
        if missed > 0 {
            self.missed_targets += missed;
            self.streak = 0;
        }
    }

    fn spawn(&mut self, now: Instant) {
        let kind = self.spawner.draw_kind();
        self.spawn_kind(kind, now);
    }

    fn spawn_kind(&mut self, kind: StimulusKind, now: Instant) {
        let position = self.spawner.draw_position();
        self.next_id += 1;
        self.active.push(Stimulus {
            id: self.next_id,
            kind,
            position,
            spawned_at: now,
            deadline: now + self.pacing.stimulus_lifetime,
        });

        match kind {
            StimulusKind::Target => {
                self.targets_spawned += 1;
                // Review pacing once per threshold multiple; a new interval
                // only applies from the next scheduled spawn.
                if self.targets_spawned % REVIEW_EVERY_TARGETS == 0 {
                    let snapshot = self.metrics();
                    self.pacing.review(&snapshot);
                }
            }
            StimulusKind::Distractor => self.distractors_spawned += 1,
        }
    }

    /// Resolve a stimulus by id. Unknown or already-resolved ids and taps
    /// outside Running are silently ignored; whichever of hit and expiry
    /// lands first wins.
    pub fn resolve(&mut self, id: u64, now: Instant) -> TapOutcome {
        if self.phase != Phase::Running {
            return TapOutcome::Ignored;
        }
        let Some(idx) = self.active.iter().position(|s| s.id == id) else {
            return TapOutcome::Ignored;
        };
        let stimulus = self.active.swap_remove(idx);

        match stimulus.kind {
            StimulusKind::Target => {
                let reaction = now - stimulus.spawned_at;
                self.reaction_times.push(reaction);
                self.correct_hits += 1;
                self.streak += 1;
                self.max_streak = self.max_streak.max(self.streak);

                let reaction_ms = reaction.as_millis() as u64;
                let mut points = BASE_POINTS;
                if reaction_ms < FAST_BONUS_MS {
                    points += FAST_BONUS;
                }
                if reaction_ms < VERY_FAST_BONUS_MS {
                    points += FAST_BONUS;
                }
                points += (self.streak * STREAK_BONUS_STEP).min(STREAK_BONUS_CAP);
                self.score += points;
                TapOutcome::CorrectHit { points }
            }
            StimulusKind::Distractor => {
                self.false_alarms += 1;
                self.streak = 0;
                self.score = self.score.saturating_sub(FALSE_ALARM_PENALTY);
                TapOutcome::FalseAlarm
            }
        }
    }

    /// A tap somewhere in the play area: resolves the nearest stimulus in
    /// hit range, otherwise counts as an impulse slip on empty space.
    pub fn tap_at(&mut self, position: Position, now: Instant) -> TapOutcome {
        if self.phase != Phase::Running {
            return TapOutcome::Ignored;
        }
        let hit = self
            .active
            .iter()
            .map(|s| (s.id, s.position.distance_to(position)))
            .filter(|(_, d)| *d <= HIT_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id);

        match hit {
            Some(id) => self.resolve(id, now),
            None => self.background_tap(),
        }
    }

    pub fn background_tap(&mut self) -> TapOutcome {
        if self.phase != Phase::Running {
            return TapOutcome::Ignored;
        }
        self.score = self.score.saturating_sub(BACKGROUND_TAP_PENALTY);
        TapOutcome::BackgroundTap
    }

    /// Derived metrics at this moment. Counters are frozen after stop, so
    /// this keeps returning the final values in Finished.
    pub fn metrics(&self) -> MetricsSnapshot {
        metrics::derive(RawCounts {
            correct_hits: self.correct_hits,
            missed_targets: self.missed_targets,
            false_alarms: self.false_alarms,
            targets_spawned: self.targets_spawned,
            distractors_spawned: self.distractors_spawned,
            reaction_times: &self.reaction_times,
        })
    }
}
