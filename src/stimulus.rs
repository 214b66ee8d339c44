use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

/// Probability that a spawned stimulus is a target rather than a distractor.
pub const TARGET_PROBABILITY: f64 = 0.6;
/// Keep-out distance from the play-area edges so a stimulus stays fully visible.
pub const EDGE_MARGIN: f64 = 60.0;
/// Half-width of the centered exclusion square (the fixation zone).
pub const CENTER_EXCLUSION: f64 = 100.0;
/// Taps within this distance of a stimulus center count as hitting it.
pub const HIT_RADIUS: f64 = 30.0;

/// Rejection sampling gives up after this many draws and falls back to a
/// fixed corner position, so a play area swallowed by the exclusion zone
/// cannot hang the spawner.
const MAX_PLACEMENT_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimulusKind {
    Target,
    Distractor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn distance_to(&self, other: Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Logical play-area rectangle, in abstract units. The UI maps terminal
/// cells onto this space in both directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayArea {
    pub width: f64,
    pub height: f64,
}

impl Default for PlayArea {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl PlayArea {
    fn in_center_exclusion(&self, p: Position) -> bool {
        p.x > self.width / 2.0 - CENTER_EXCLUSION
            && p.x < self.width / 2.0 + CENTER_EXCLUSION
            && p.y > self.height / 2.0 - CENTER_EXCLUSION
            && p.y < self.height / 2.0 + CENTER_EXCLUSION
    }
}

/// One spawned on-screen object. Resolution happens at most once; the
/// session enforces that by removing the stimulus from the active set.
#[derive(Debug, Clone, Copy)]
pub struct Stimulus {
    pub id: u64,
    pub kind: StimulusKind,
    pub position: Position,
    pub spawned_at: Instant,
    pub deadline: Instant,
}

impl Stimulus {
    pub fn is_target(&self) -> bool {
        self.kind == StimulusKind::Target
    }
}

/// Draws stimulus kinds and positions. Seedable so tests (and `--seed`)
/// get reproducible runs.
#[derive(Debug)]
pub struct Spawner {
    pub play_area: PlayArea,
    rng: StdRng,
}

impl Spawner {
    pub fn new(play_area: PlayArea) -> Self {
        Self {
            play_area,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(play_area: PlayArea, seed: u64) -> Self {
        Self {
            play_area,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn draw_kind(&mut self) -> StimulusKind {
        if self.rng.gen_bool(TARGET_PROBABILITY) {
            StimulusKind::Target
        } else {
            StimulusKind::Distractor
        }
    }

    /// Uniform position over the play area, rejecting the fixation zone.
    /// Falls back to the top-left margin corner after bounded retries.
    pub fn draw_position(&mut self) -> Position {
        let area = self.play_area;
        let max_x = (area.width - EDGE_MARGIN).max(EDGE_MARGIN);
        let max_y = (area.height - EDGE_MARGIN).max(EDGE_MARGIN);

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let p = Position {
                x: self.rng.gen_range(EDGE_MARGIN..=max_x),
                y: self.rng.gen_range(EDGE_MARGIN..=max_y),
            };
            if !area.in_center_exclusion(p) {
                return p;
            }
        }

        Position {
            x: EDGE_MARGIN,
            y: EDGE_MARGIN,
        }
    }
}
