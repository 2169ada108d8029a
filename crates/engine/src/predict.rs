//! Speculative pre-rendering of the local player's next frame.
//!
//! Every tick the cache renders four hypotheses (continue, stop, turn left,
//! turn right) against the current baseline. When the real post-move state
//! matches one of them, its diff is served without composing anything.
//!
//! Hypothesis probabilities come from [`MotionModel`], an exponential moving
//! average over the classes of the last few real moves.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use arrayvec::ArrayVec;

use crate::adapter::apply_move;
use crate::term::FrameBuffer;
use crate::types::{
    Direction, PlayerVisualState, DEFAULT_MOTION_HISTORY, INITIAL_CONTINUE_WEIGHT,
    INITIAL_STOP_WEIGHT, MOTION_LEARNING_RATE, PREDICTION_FRESHNESS_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictionKind {
    Continue,
    Stop,
    TurnLeft,
    TurnRight,
}

impl PredictionKind {
    pub const ALL: [PredictionKind; 4] = [
        PredictionKind::Continue,
        PredictionKind::Stop,
        PredictionKind::TurnLeft,
        PredictionKind::TurnRight,
    ];

    /// The state this hypothesis leads to from `state`.
    pub fn apply(self, state: &PlayerVisualState) -> PlayerVisualState {
        let mut next = state.clone();
        match self {
            PredictionKind::Continue => apply_move(&mut next, state.direction, |_, _| true),
            PredictionKind::Stop => next.moving = false,
            PredictionKind::TurnLeft => apply_move(&mut next, state.direction.turn_left(), |_, _| true),
            PredictionKind::TurnRight => apply_move(&mut next, state.direction.turn_right(), |_, _| true),
        }
        next
    }
}

/// Class of one observed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Continue,
    Stop,
    Turn,
}

/// Classify the move from `a` to `b`.
pub fn classify_motion(a: (i32, i32, Direction), b: (i32, i32, Direction)) -> Motion {
    let (ax, ay, ad) = a;
    let (bx, by, bd) = b;
    if (ax, ay) == (bx, by) {
        return Motion::Stop;
    }
    let (dx, dy) = ad.delta();
    if (bx, by) == (ax + dx, ay + dy) && ad == bd {
        Motion::Continue
    } else {
        Motion::Turn
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probabilities {
    pub cont: f32,
    pub stop: f32,
    pub turn: f32,
}

impl Probabilities {
    pub fn get(&self, kind: PredictionKind) -> f32 {
        match kind {
            PredictionKind::Continue => self.cont,
            PredictionKind::Stop => self.stop,
            // Either turn direction is equally likely.
            PredictionKind::TurnLeft | PredictionKind::TurnRight => self.turn / 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotionModel {
    history: VecDeque<(i32, i32, Direction)>,
    capacity: usize,
    rate: f32,
    cont: f32,
    stop: f32,
}

impl Default for MotionModel {
    fn default() -> Self {
        Self::new(DEFAULT_MOTION_HISTORY, MOTION_LEARNING_RATE)
    }
}

impl MotionModel {
    pub fn new(capacity: usize, rate: f32) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity.max(2)),
            capacity: capacity.max(2),
            rate: rate.clamp(0.0, 1.0),
            cont: INITIAL_CONTINUE_WEIGHT,
            stop: INITIAL_STOP_WEIGHT,
        }
    }

    pub fn probabilities(&self) -> Probabilities {
        Probabilities {
            cont: self.cont,
            stop: self.stop,
            turn: 1.0 - self.cont - self.stop,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &(i32, i32, Direction)> {
        self.history.iter()
    }

    /// Record a real post-move state and fold the recent history into the
    /// weights.
    pub fn record(&mut self, x: i32, y: i32, direction: Direction) -> Probabilities {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back((x, y, direction));
        if self.history.len() < 2 {
            return self.probabilities();
        }

        let (mut n_cont, mut n_stop, mut n) = (0u32, 0u32, 0u32);
        for (a, b) in self.history.iter().zip(self.history.iter().skip(1)) {
            match classify_motion(*a, *b) {
                Motion::Continue => n_cont += 1,
                Motion::Stop => n_stop += 1,
                Motion::Turn => {}
            }
            n += 1;
        }
        let (c, s) = (n_cont as f32 / n as f32, n_stop as f32 / n as f32);
        self.cont += self.rate * (c - self.cont);
        self.stop += self.rate * (s - self.stop);
        self.probabilities()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[derive(Debug, Clone)]
pub struct PredictionEntry {
    pub kind: PredictionKind,
    pub probability: f32,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    /// Escape sequences turning the baseline into this frame.
    pub output: Vec<u8>,
    pub bytes: usize,
    /// Frame the terminal shows after `output`; `None` when nothing changes.
    pub frame: Option<FrameBuffer>,
    /// Encoder generation the diff was computed against.
    pub baseline: u64,
    pub created_at: Instant,
}

impl PredictionEntry {
    pub fn matches(&self, x: i32, y: i32, direction: Direction) -> bool {
        (self.x, self.y, self.direction) == (x, y, direction)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictionStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses where the key matched but the entry was too old.
    pub stale: u64,
    /// Misses where the key matched but the baseline had moved on.
    pub outdated: u64,
    pub rendered: u64,
    pub bytes_served: u64,
}

impl PredictionStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[derive(Debug)]
pub struct PredictionCache {
    enabled: bool,
    freshness: Duration,
    model: MotionModel,
    entries: ArrayVec<PredictionEntry, 4>,
    stats: PredictionStats,
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PredictionCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            freshness: Duration::from_millis(PREDICTION_FRESHNESS_MS),
            model: MotionModel::default(),
            entries: ArrayVec::new(),
            stats: PredictionStats::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling drops every stored prediction and the motion history.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.entries.clear();
            self.model.clear_history();
        }
    }

    pub fn stats(&self) -> PredictionStats {
        self.stats
    }

    pub fn model(&self) -> &MotionModel {
        &self.model
    }

    pub fn entries(&self) -> &[PredictionEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn record(&mut self, state: &PlayerVisualState) -> Option<Probabilities> {
        if !self.enabled {
            return None;
        }
        Some(self.model.record(state.x, state.y, state.direction))
    }

    /// Rebuild all four hypotheses for `state`. `render` returns the frame and
    /// its diff against the current baseline, or `None` when it cannot
    /// produce one; such hypotheses are skipped.
    pub fn predict(
        &mut self,
        state: &PlayerVisualState,
        now: Instant,
        baseline: u64,
        mut render: impl FnMut(&PlayerVisualState) -> Option<(FrameBuffer, Vec<u8>)>,
    ) {
        self.entries.clear();
        if !self.enabled {
            return;
        }
        let probs = self.model.probabilities();
        for kind in PredictionKind::ALL {
            let next = kind.apply(state);
            let (frame, output) = if kind == PredictionKind::Stop {
                (None, Vec::new())
            } else {
                match render(&next) {
                    Some((frame, output)) => (Some(frame), output),
                    None => continue,
                }
            };
            self.stats.rendered += 1;
            self.entries.push(PredictionEntry {
                kind,
                probability: probs.get(kind),
                x: next.x,
                y: next.y,
                direction: next.direction,
                bytes: output.len(),
                output,
                frame,
                baseline,
                created_at: now,
            });
        }
    }

    /// Take the entry for the real post-move state, if it is still valid.
    pub fn lookup(&mut self, x: i32, y: i32, direction: Direction, now: Instant, baseline: u64) -> Option<PredictionEntry> {
        if !self.enabled {
            return None;
        }
        let Some(pos) = self.entries.iter().position(|e| e.matches(x, y, direction)) else {
            self.stats.misses += 1;
            tracing::debug!(x, y, ?direction, "prediction miss");
            return None;
        };
        let entry = self.entries.swap_remove(pos);
        let age = now.saturating_duration_since(entry.created_at);
        if age >= self.freshness {
            self.stats.misses += 1;
            self.stats.stale += 1;
            tracing::debug!(kind = ?entry.kind, ?age, "prediction stale");
            return None;
        }
        if entry.baseline != baseline {
            self.stats.misses += 1;
            self.stats.outdated += 1;
            tracing::debug!(kind = ?entry.kind, "prediction rendered against an old baseline");
            return None;
        }
        self.stats.hits += 1;
        self.stats.bytes_served += entry.bytes as u64;
        tracing::debug!(kind = ?entry.kind, bytes = entry.bytes, "prediction hit");
        Some(entry)
    }
}
