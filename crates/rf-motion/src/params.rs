//! Motion tuning derived from [`GameConfig`]

use std::collections::BTreeMap;

use rf_core::{GameConfig, SymbolSpec};

/// Everything a lane needs to animate. Times are in seconds, velocities in
/// offset units per second.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionParams {
    pub start_velocity: f64,
    pub idle_velocity: f64,
    pub decay_factor: f64,
    pub align_tolerance: f64,
    pub symbol_size: f64,
    pub symbols_per_lane: usize,
    pub lane_count: usize,
    pub stop_delay: f64,
    pub lane_stagger: f64,
    pub cool_down: f64,
    pub symbols: Vec<SymbolSpec>,
    pub seed: Option<u64>,
    /// Multiplier by matching payline count
    pub payout_table: BTreeMap<usize, f64>,
}

impl MotionParams {
    /// Length of one full strip revolution
    pub fn cycle(&self) -> f64 {
        self.symbols_per_lane as f64 * self.symbol_size
    }

    /// Rest offset: centre of the last row
    pub fn target_offset(&self) -> f64 {
        self.cycle() - self.symbol_size / 2.0
    }

    /// Time lane `index` spins at full speed before braking
    pub fn stop_after(&self, index: usize) -> f64 {
        self.stop_delay + index as f64 * self.lane_stagger
    }

    /// Ticks spent braking from start to idle velocity
    pub fn braking_ticks(&self) -> usize {
        if self.start_velocity <= self.idle_velocity {
            return 0;
        }
        let ratio = (self.idle_velocity / self.start_velocity).ln() / self.decay_factor.ln();
        ratio.ceil().max(0.0) as usize
    }

    pub fn total_weight(&self) -> f64 {
        self.symbols.iter().map(|s| s.weight).sum()
    }
}

impl From<&GameConfig> for MotionParams {
    fn from(config: &GameConfig) -> Self {
        Self {
            start_velocity: config.start_velocity,
            idle_velocity: config.idle_velocity,
            decay_factor: config.decay_factor,
            align_tolerance: config.align_tolerance,
            symbol_size: config.symbol_size,
            symbols_per_lane: config.symbols_per_lane,
            lane_count: config.lane_count,
            stop_delay: config.stop_delay_ms as f64 / 1000.0,
            lane_stagger: config.lane_stagger_ms as f64 / 1000.0,
            cool_down: config.cool_down_ms as f64 / 1000.0,
            symbols: config.symbol_set.clone(),
            seed: config.seed,
            payout_table: config.payout_table.clone(),
        }
    }
}

impl Default for MotionParams {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}
