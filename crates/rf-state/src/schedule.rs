//! Adaptive payout deadline
//!
//! Payouts get rarer as total value grows: one extra minute per
//! `unit_value` of total value, capped at `cap_minutes`.

use rf_core::{GameConfig, Money};
use serde::{Deserialize, Serialize};

pub const MINUTE_MS: u64 = 60_000;

/// Parameters of the deadline function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutTiming {
    pub base_interval_ms: u64,
    pub cap_minutes: u64,
    pub unit_value: Money,
}

impl PayoutTiming {
    /// `base + min(cap, floor(total / unit)) * 60s`
    pub fn interval_ms(&self, total_value: Money) -> u64 {
        let steps = if total_value.is_finite() && total_value > 0.0 && self.unit_value > 0.0 {
            (total_value / self.unit_value).floor()
        } else {
            0.0
        };
        let extra_minutes = steps.min(self.cap_minutes as f64) as u64;
        self.base_interval_ms
            .saturating_add(extra_minutes.saturating_mul(MINUTE_MS))
    }

    /// Upper bound of [`Self::interval_ms`]
    pub fn max_interval_ms(&self) -> u64 {
        self.base_interval_ms
            .saturating_add(self.cap_minutes.saturating_mul(MINUTE_MS))
    }
}

impl Default for PayoutTiming {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}

impl From<&GameConfig> for PayoutTiming {
    fn from(config: &GameConfig) -> Self {
        Self {
            base_interval_ms: config.base_interval,
            cap_minutes: config.interval_cap_minutes,
            unit_value: config.unit_value_for_cap,
        }
    }
}

/// How each contribution is split into pool and owner balances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShareSplit {
    pub pool: f64,
    pub owner: f64,
}

impl From<&GameConfig> for ShareSplit {
    fn from(config: &GameConfig) -> Self {
        Self {
            pool: config.pool_share_pct,
            owner: config.owner_share_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> PayoutTiming {
        PayoutTiming {
            base_interval_ms: 22_000,
            cap_minutes: 2,
            unit_value: 10_000.0,
        }
    }

    #[test]
    fn test_base_interval_at_zero() {
        assert_eq!(timing().interval_ms(0.0), 22_000);
        assert_eq!(timing().interval_ms(9_999.99), 22_000);
    }

    #[test]
    fn test_one_minute_per_unit() {
        assert_eq!(timing().interval_ms(10_000.0), 82_000);
        assert_eq!(timing().interval_ms(19_999.0), 82_000);
    }

    #[test]
    fn test_capped() {
        assert_eq!(timing().interval_ms(25_000.0), 142_000);
        assert_eq!(timing().interval_ms(1e12), 142_000);
        assert_eq!(timing().max_interval_ms(), 142_000);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(timing().interval_ms(-50_000.0), 22_000);
        assert_eq!(timing().interval_ms(f64::NAN), 22_000);
        assert_eq!(timing().interval_ms(f64::INFINITY), 22_000);

        let no_unit = PayoutTiming {
            unit_value: 0.0,
            ..timing()
        };
        assert_eq!(no_unit.interval_ms(1e9), 22_000);
    }

    #[test]
    fn test_monotonic_in_total_value() {
        let t = timing();
        let mut last = 0;
        for step in 0..100 {
            let interval = t.interval_ms(step as f64 * 777.0);
            assert!(interval >= last);
            assert!(interval <= t.max_interval_ms());
            last = interval;
        }
    }
}
