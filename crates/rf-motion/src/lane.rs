//! One reel lane

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::params::MotionParams;

/// Per-lane animation phase. Times in seconds, velocities in units/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum MotionState {
    Idle,
    Spinning { elapsed: f64, target_velocity: f64 },
    Decelerating { velocity: f64 },
    Aligning { closest_offset: f64 },
    Stopped { rest_offset: f64, elapsed: f64 },
}

impl MotionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Spinning { .. } => "spinning",
            Self::Decelerating { .. } => "decelerating",
            Self::Aligning { .. } => "aligning",
            Self::Stopped { .. } => "stopped",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }
}

/// A symbol on the strip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StripSymbol {
    /// Index into the configured symbol set
    pub symbol: usize,
    /// Centre position along the cycle, `0 <= offset < cycle`
    pub offset: f64,
}

/// Reported when a lane comes to rest
#[derive(Debug, Clone, PartialEq)]
pub struct LaneStop {
    pub lane: usize,
    /// Symbol names, top row first
    pub symbols: Vec<String>,
}

impl LaneStop {
    /// Symbol resting on the target row (the bottom one)
    pub fn payline(&self) -> Option<&str> {
        self.symbols.last().map(String::as_str)
    }
}

pub struct Lane {
    index: usize,
    params: Arc<MotionParams>,
    strip: Vec<StripSymbol>,
    state: MotionState,
    velocity: f64,
    rng: ChaCha8Rng,
}

impl Lane {
    pub fn new(index: usize, params: Arc<MotionParams>) -> Self {
        let mut rng = match params.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => ChaCha8Rng::from_os_rng(),
        };

        let size = params.symbol_size;
        let strip = (0..params.symbols_per_lane)
            .map(|row| StripSymbol {
                symbol: draw_symbol(&mut rng, &params),
                offset: row as f64 * size + size / 2.0,
            })
            .collect();

        Self {
            index,
            velocity: params.idle_velocity,
            params,
            strip,
            state: MotionState::Idle,
            rng,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn strip(&self) -> &[StripSymbol] {
        &self.strip
    }

    /// Symbol names ordered top row first
    pub fn visible(&self) -> Vec<String> {
        let mut rows: Vec<&StripSymbol> = self.strip.iter().collect();
        rows.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        rows.into_iter()
            .map(|s| self.params.symbols[s.symbol].name.clone())
            .collect()
    }

    /// Start a spin. Ignored unless the lane is idle.
    pub fn spin_requested(&mut self) -> bool {
        if !self.state.is_idle() {
            log::trace!("[Motion] Lane {} busy ({}), spin ignored", self.index, self.state.name());
            return false;
        }

        self.velocity = self.params.start_velocity;
        self.state = MotionState::Spinning {
            elapsed: 0.0,
            target_velocity: self.params.start_velocity,
        };
        true
    }

    /// Advance by `dt` seconds. Returns the final symbols when this tick
    /// brought the lane to rest.
    pub fn tick(&mut self, dt: f64) -> Option<LaneStop> {
        if !(dt.is_finite() && dt > 0.0) {
            return None;
        }

        match self.state {
            MotionState::Idle => {
                self.advance(self.params.idle_velocity * dt);
                None
            }
            MotionState::Spinning {
                elapsed,
                target_velocity,
            } => {
                self.advance(target_velocity * dt);
                let elapsed = elapsed + dt;
                self.state = if elapsed >= self.params.stop_after(self.index) {
                    MotionState::Decelerating {
                        velocity: target_velocity,
                    }
                } else {
                    MotionState::Spinning {
                        elapsed,
                        target_velocity,
                    }
                };
                None
            }
            MotionState::Decelerating { velocity } => {
                let velocity = velocity * self.params.decay_factor;
                self.velocity = velocity;
                self.advance(velocity * dt);
                if velocity <= self.params.idle_velocity {
                    self.velocity = self.params.idle_velocity;
                    self.state = MotionState::Aligning {
                        closest_offset: self.closest_offset(),
                    };
                } else {
                    self.state = MotionState::Decelerating { velocity };
                }
                None
            }
            MotionState::Aligning { .. } => self.align(dt),
            MotionState::Stopped {
                rest_offset,
                elapsed,
            } => {
                let elapsed = elapsed + dt;
                if elapsed >= self.params.cool_down {
                    self.velocity = self.params.idle_velocity;
                    self.state = MotionState::Idle;
                } else {
                    self.state = MotionState::Stopped {
                        rest_offset,
                        elapsed,
                    };
                }
                None
            }
        }
    }

    /// Upper bound on ticks from a spin request until `Stopped`
    pub fn settle_tick_bound(&self, dt: f64) -> usize {
        let spinning = (self.params.stop_after(self.index) / dt).ceil() as usize + 1;
        let braking = self.params.braking_ticks() + 1;
        let aligning = (self.params.symbol_size / (self.params.idle_velocity * dt)).ceil() as usize + 1;
        spinning + braking + aligning
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STRIP MOVEMENT
    // ═══════════════════════════════════════════════════════════════════════

    fn align(&mut self, dt: f64) -> Option<LaneStop> {
        if self.within_tolerance() {
            return Some(self.snap());
        }

        // Never run past the symbol that is about to reach the target.
        let step = (self.params.idle_velocity * dt).min(self.trailing_distance());
        self.advance(step);

        if self.within_tolerance() {
            return Some(self.snap());
        }
        self.state = MotionState::Aligning {
            closest_offset: self.closest_offset(),
        };
        None
    }

    /// Move every symbol down by `distance`, redrawing whatever wraps.
    ///
    /// A symbol is redrawn at most once per call however many times it
    /// wraps. A move too large to represent counts as one full turn.
    fn advance(&mut self, distance: f64) {
        let cycle = self.params.cycle();
        for i in 0..self.strip.len() {
            let moved = self.strip[i].offset + distance;
            let (offset, wrapped) = if moved.is_finite() {
                (moved.rem_euclid(cycle), moved >= cycle)
            } else {
                (self.strip[i].offset, true)
            };
            if wrapped {
                self.strip[i].symbol = draw_symbol(&mut self.rng, &self.params);
            }
            self.strip[i].offset = offset;
        }
    }

    /// Circular distance from `offset` to the target
    fn distance_to_target(&self, offset: f64) -> f64 {
        let cycle = self.params.cycle();
        let d = (offset - self.params.target_offset()).rem_euclid(cycle);
        d.min(cycle - d)
    }

    fn closest(&self) -> Option<&StripSymbol> {
        self.strip.iter().min_by(|a, b| {
            self.distance_to_target(a.offset)
                .total_cmp(&self.distance_to_target(b.offset))
        })
    }

    fn closest_offset(&self) -> f64 {
        self.closest().map_or(0.0, |s| s.offset)
    }

    fn within_tolerance(&self) -> bool {
        self.closest()
            .is_some_and(|s| self.distance_to_target(s.offset) < self.params.align_tolerance)
    }

    /// Forward distance the nearest symbol behind the target still has to go
    fn trailing_distance(&self) -> f64 {
        let cycle = self.params.cycle();
        let target = self.params.target_offset();
        self.strip
            .iter()
            .map(|s| (target - s.offset).rem_euclid(cycle))
            .fold(cycle, f64::min)
    }

    /// Put the closest symbol exactly on the target and re-grid the rest.
    fn snap(&mut self) -> LaneStop {
        let cycle = self.params.cycle();
        let size = self.params.symbol_size;
        let target = self.params.target_offset();
        let anchor = self.closest_offset();

        for s in &mut self.strip {
            let rows = ((s.offset - anchor) / size).round();
            s.offset = (target + rows * size).rem_euclid(cycle);
        }

        self.velocity = 0.0;
        self.state = MotionState::Stopped {
            rest_offset: target,
            elapsed: 0.0,
        };

        let stop = LaneStop {
            lane: self.index,
            symbols: self.visible(),
        };
        log::debug!("[Motion] Lane {} stopped on {:?}", self.index, stop.symbols);
        stop
    }
}

/// Weighted draw from the symbol set
fn draw_symbol(rng: &mut ChaCha8Rng, params: &MotionParams) -> usize {
    let total = params.total_weight();
    if params.symbols.len() <= 1 || !(total > 0.0) {
        return 0;
    }

    let mut roll = rng.random_range(0.0..total);
    for (i, spec) in params.symbols.iter().enumerate() {
        if roll < spec.weight {
            return i;
        }
        roll -= spec.weight;
    }
    params.symbols.len() - 1
}
