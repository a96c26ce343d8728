//! Spin outcome scoring
//!
//! A settled spin is scored by its payline: the symbol each lane rests on at
//! the target row. The largest group of identical symbols picks the
//! multiplier from the payout table.

use std::collections::BTreeMap;

use rf_core::Money;
use serde::Serialize;

/// Score of one settled spin
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinOutcome {
    /// Payline symbol of every lane, lane 0 first
    pub symbols: Vec<String>,
    /// Symbol of the largest matching group (first lane wins ties)
    pub best_symbol: String,
    /// Size of that group
    pub matches: usize,
    pub multiplier: f64,
    /// Buy amount that triggered the spin, when known
    pub stake: Option<Money>,
}

impl SpinOutcome {
    /// Score `symbols`. `None` for an empty payline.
    pub fn evaluate(
        symbols: Vec<String>,
        table: &BTreeMap<usize, f64>,
        stake: Option<Money>,
    ) -> Option<Self> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for symbol in &symbols {
            match counts.iter_mut().find(|(name, _)| *name == symbol.as_str()) {
                Some((_, n)) => *n += 1,
                None => counts.push((symbol.as_str(), 1)),
            }
        }

        // `max_by_key` keeps the last maximum; scan in reverse so the first
        // lane's symbol wins a tie.
        let (best_symbol, matches) = counts
            .iter()
            .rev()
            .max_by_key(|(_, n)| *n)
            .map(|(name, n)| (name.to_string(), *n))?;
        let multiplier = table.get(&matches).copied().unwrap_or(0.0);

        Some(Self {
            symbols,
            best_symbol,
            matches,
            multiplier,
            stake,
        })
    }

    /// `stake * multiplier`, rounded to cents
    pub fn reward(&self) -> Option<Money> {
        self.stake
            .map(|stake| (stake * self.multiplier * 100.0).round() / 100.0)
    }

    /// The reward beats the stake
    pub fn is_win(&self) -> bool {
        match (self.stake, self.reward()) {
            (Some(stake), Some(reward)) => reward > stake,
            _ => self.multiplier > 1.0,
        }
    }
}
