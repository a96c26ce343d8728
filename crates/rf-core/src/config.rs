//! Game configuration
//!
//! One flat, camelCase JSON document. Every key is optional; missing keys
//! take the documented defaults below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RfError, RfResult};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "REELFIRE_CONFIG";

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "reelfire.config.json";

/// A drawable reel symbol with its relative weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSymbol")]
pub struct SymbolSpec {
    pub name: String,
    pub weight: f64,
}

impl SymbolSpec {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Accepts either `"pepe"` or `{ "name": "pepe", "weight": 2 }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSymbol {
    Name(String),
    Weighted {
        name: String,
        #[serde(default = "default_weight")]
        weight: f64,
    },
}

fn default_weight() -> f64 {
    1.0
}

impl From<RawSymbol> for SymbolSpec {
    fn from(raw: RawSymbol) -> Self {
        match raw {
            RawSymbol::Name(name) => Self::new(name, 1.0),
            RawSymbol::Weighted { name, weight } => Self::new(name, weight),
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    // ─── Jackpot schedule ────────────────────────────────────────────────
    /// Base payout interval (ms)
    pub base_interval: u64,
    /// Maximum number of whole minutes added on top of the base interval
    pub interval_cap_minutes: u64,
    /// Total value that adds one minute to the interval
    pub unit_value_for_cap: f64,
    /// Shortest delay a jackpot timer is ever armed for (ms)
    pub min_timer_delay_ms: u64,

    // ─── Contribution split ──────────────────────────────────────────────
    pub pool_share_pct: f64,
    pub owner_share_pct: f64,
    /// Fraction of the owner balance suggested as payout
    pub payout_fraction: f64,
    /// Smallest accepted buy amount (unbounded when absent)
    pub min_buy_amount: Option<f64>,
    /// Largest accepted buy amount (unbounded when absent)
    pub max_buy_amount: Option<f64>,

    // ─── Motion ──────────────────────────────────────────────────────────
    /// Spin start velocity (offset units per second)
    pub start_velocity: f64,
    /// Crawl/drift velocity (offset units per second)
    pub idle_velocity: f64,
    /// Per-tick velocity multiplier while decelerating
    pub decay_factor: f64,
    /// Snap distance when aligning to the rest offset
    pub align_tolerance: f64,
    pub symbol_set: Vec<SymbolSpec>,
    pub lane_count: usize,
    pub symbols_per_lane: usize,
    pub symbol_size: f64,
    /// Time a lane spins at full speed before it starts braking (ms)
    pub stop_delay_ms: u64,
    /// Extra stop delay per lane index (ms)
    pub lane_stagger_ms: u64,
    /// Time a stopped lane waits before returning to idle (ms)
    pub cool_down_ms: u64,
    /// Fixed RNG seed for symbol draws (random when absent)
    pub seed: Option<u64>,
    /// Spin multiplier by the number of lanes showing the same symbol.
    /// Counts missing from the table pay nothing.
    pub payout_table: BTreeMap<usize, f64>,

    // ─── Delivery ────────────────────────────────────────────────────────
    pub heartbeat_ms: u64,
    /// Per-subscriber queue depth before a slow client is dropped
    pub subscriber_queue: usize,
    pub http_addr: String,
    pub tcp_addr: String,
    /// Generate random buys/sells for demos
    pub mock: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            base_interval: 22_000,
            interval_cap_minutes: 120,
            unit_value_for_cap: 10_000.0,
            min_timer_delay_ms: 1_000,

            pool_share_pct: 0.01,
            owner_share_pct: 0.02,
            payout_fraction: 0.5,
            min_buy_amount: None,
            max_buy_amount: None,

            start_velocity: 960.0,
            idle_velocity: 72.0,
            decay_factor: 0.85,
            align_tolerance: 2.0,
            symbol_set: vec![
                SymbolSpec::new("pepe", 1.0),
                SymbolSpec::new("doge", 1.0),
                SymbolSpec::new("meme", 1.0),
            ],
            lane_count: 5,
            symbols_per_lane: 3,
            symbol_size: 90.0,
            stop_delay_ms: 1_500,
            lane_stagger_ms: 250,
            cool_down_ms: 3_000,
            seed: None,
            payout_table: BTreeMap::from([(3, 2.0), (4, 4.0), (5, 12.0)]),

            heartbeat_ms: 3_000,
            subscriber_queue: 256,
            http_addr: "127.0.0.1:8787".to_string(),
            tcp_addr: "127.0.0.1:8788".to_string(),
            mock: false,
        }
    }
}

impl GameConfig {
    /// Load from `$REELFIRE_CONFIG`, then `./reelfire.config.json`, falling
    /// back to defaults when neither exists.
    pub fn load() -> RfResult<Self> {
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return Self::load_from_path(&PathBuf::from(p));
        }

        let cwd = std::env::current_dir()?;
        let local = cwd.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load_from_path(&local);
        }

        log::info!("[Config] No {} found, using defaults", CONFIG_FILE_NAME);
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> RfResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| RfError::Config(format!("Failed to read {path:?}: {e}")))?;
        let config = Self::from_json(&raw)?;
        log::info!("[Config] Loaded {:?}", path);
        Ok(config)
    }

    pub fn from_json(raw: &str) -> RfResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| RfError::Config(format!("Invalid {CONFIG_FILE_NAME}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the schedule and motion formulas cannot work with
    pub fn validate(&self) -> RfResult<()> {
        let fraction = |name: &str, v: f64| {
            if v.is_finite() && (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(RfError::Config(format!("{name} must be within [0, 1], got {v}")))
            }
        };

        fraction("poolSharePct", self.pool_share_pct)?;
        fraction("ownerSharePct", self.owner_share_pct)?;
        fraction("payoutFraction", self.payout_fraction)?;
        if self.pool_share_pct + self.owner_share_pct > 1.0 {
            return Err(RfError::Config(
                "poolSharePct + ownerSharePct must not exceed 1".into(),
            ));
        }

        let positive = |v: Option<f64>| v.is_none_or(|v| v.is_finite() && v > 0.0);
        if !positive(self.min_buy_amount) || !positive(self.max_buy_amount) {
            return Err(RfError::Config(
                "minBuyAmount and maxBuyAmount must be positive".into(),
            ));
        }
        if let (Some(min), Some(max)) = (self.min_buy_amount, self.max_buy_amount) {
            if min > max {
                return Err(RfError::Config(format!(
                    "minBuyAmount ({min}) exceeds maxBuyAmount ({max})"
                )));
            }
        }

        if !self.unit_value_for_cap.is_finite() || self.unit_value_for_cap <= 0.0 {
            return Err(RfError::Config("unitValueForCap must be positive".into()));
        }
        if self.base_interval == 0 {
            return Err(RfError::Config("baseInterval must be positive".into()));
        }

        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(RfError::Config(format!(
                "decayFactor must be within (0, 1), got {}",
                self.decay_factor
            )));
        }
        if !(self.idle_velocity.is_finite() && self.idle_velocity > 0.0) {
            return Err(RfError::Config("idleVelocity must be positive".into()));
        }
        if !(self.start_velocity.is_finite() && self.start_velocity > self.idle_velocity) {
            return Err(RfError::Config(
                "startVelocity must be greater than idleVelocity".into(),
            ));
        }
        if !(self.align_tolerance.is_finite() && self.align_tolerance > 0.0) {
            return Err(RfError::Config("alignTolerance must be positive".into()));
        }
        if !(self.symbol_size.is_finite() && self.symbol_size > 0.0) {
            return Err(RfError::Config("symbolSize must be positive".into()));
        }

        if self.symbol_set.is_empty() {
            return Err(RfError::Config("symbolSet must not be empty".into()));
        }
        if self
            .symbol_set
            .iter()
            .any(|s| !s.weight.is_finite() || s.weight <= 0.0)
        {
            return Err(RfError::Config("symbol weights must be positive".into()));
        }
        if self
            .payout_table
            .values()
            .any(|m| !m.is_finite() || *m < 0.0)
        {
            return Err(RfError::Config(
                "payoutTable multipliers must be finite and non-negative".into(),
            ));
        }
        if self.lane_count == 0 || self.symbols_per_lane == 0 {
            return Err(RfError::Config(
                "laneCount and symbolsPerLane must be at least 1".into(),
            ));
        }

        if self.heartbeat_ms == 0 || self.subscriber_queue == 0 {
            return Err(RfError::Config(
                "heartbeatMs and subscriberQueue must be positive".into(),
            ));
        }

        Ok(())
    }
}
