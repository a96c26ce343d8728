//! Game event vocabulary
//!
//! Everything a viewer can receive. Serialized with a `type` discriminator,
//! one JSON object per message.

use rf_core::Timestamp;
use rf_state::{ContributionEvent, PayoutEvent, PublicState, WithdrawalEvent};
use serde::{Deserialize, Serialize};

/// A message on the event bus and on every push connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Full state snapshot
    State { state: PublicState },
    /// Accepted contribution
    Buy(ContributionEvent),
    /// Accepted withdrawal
    Sell(WithdrawalEvent),
    /// Jackpot payout
    Win(PayoutEvent),
    /// Keep-alive heartbeat
    Tick { t: Timestamp },
}

impl GameEvent {
    pub fn state(state: PublicState) -> Self {
        Self::State { state }
    }

    /// Wire discriminator
    pub fn kind(&self) -> &'static str {
        match self {
            Self::State { .. } => "state",
            Self::Buy(_) => "buy",
            Self::Sell(_) => "sell",
            Self::Win(_) => "win",
            Self::Tick { .. } => "tick",
        }
    }

    /// Events a viewer animates (reels spin on buy)
    pub fn triggers_spin(&self) -> bool {
        matches!(self, Self::Buy(_))
    }

    pub fn as_state(&self) -> Option<&PublicState> {
        match self {
            Self::State { state } => Some(state),
            _ => None,
        }
    }
}
