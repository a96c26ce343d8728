//! State and domain event types

use rf_core::{Money, Timestamp};
use serde::{Deserialize, Serialize};

/// The publicly visible game state.
///
/// Every field a viewer needs to render balances and the payout countdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicState {
    pub pool_balance: Money,
    pub total_value: Money,
    pub owner_balance: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contributor: Option<Contributor>,
    /// When the next payout fires
    pub next_payout_at: Timestamp,
    /// Interval used to compute `next_payout_at`
    pub payout_interval_ms: u64,
}

impl PublicState {
    /// Zeroed balances, first deadline one interval from `now`
    pub fn initial(now: Timestamp, interval_ms: u64) -> Self {
        Self {
            pool_balance: 0.0,
            total_value: 0.0,
            owner_balance: 0.0,
            last_contributor: None,
            next_payout_at: now.saturating_add(interval_ms),
            payout_interval_ms: interval_ms,
        }
    }

    /// Time left until the next payout, saturating at zero
    pub fn remaining_ms(&self, now: Timestamp) -> u64 {
        self.next_payout_at.saturating_sub(now)
    }
}

/// Most recent contributor. Replaced wholesale by each contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub amount: Money,
    pub at: Timestamp,
}

/// A purchase (buy)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionEvent {
    pub contributor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
}

/// A sale (sell)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalEvent {
    pub contributor_id: String,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
}

/// A jackpot win. Only ever produced by the payout scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutEvent {
    pub winner_id: String,
    pub suggested_payout: Money,
}

/// A change to [`PublicState`]. Applied only through `StateStore::apply`.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Contribution(ContributionEvent),
    Withdrawal(WithdrawalEvent),
    Payout(PayoutEvent),
    /// Move the payout deadline without touching balances.
    /// `interval_ms: None` recomputes from the current total value.
    Reschedule { interval_ms: Option<u64> },
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Contribution(_) => "contribution",
            Self::Withdrawal(_) => "withdrawal",
            Self::Payout(_) => "payout",
            Self::Reschedule { .. } => "reschedule",
        }
    }
}
