//! StateStore: the single writer of [`PublicState`]
//!
//! Readers get an `Arc` snapshot swapped in after each mutation, so a read
//! never observes a half-applied write. Writers are serialized by a separate
//! mutex held for the whole read-modify-publish cycle.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use rf_core::{Clock, GameConfig, clamp_money, saturating_money};

use crate::model::{Contributor, Mutation, PublicState};
use crate::schedule::{PayoutTiming, ShareSplit};

/// How a mutation affects the payout deadline
enum Deadline {
    Keep,
    Recompute,
    Fixed(u64),
}

/// Authoritative game state
pub struct StateStore {
    current: RwLock<Arc<PublicState>>,
    writer: Mutex<()>,
    split: ShareSplit,
    timing: PayoutTiming,
    clock: Arc<dyn Clock>,
}

impl StateStore {
    pub fn new(split: ShareSplit, timing: PayoutTiming, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        let initial = PublicState::initial(now, timing.interval_ms(0.0));
        Self {
            current: RwLock::new(Arc::new(initial)),
            writer: Mutex::new(()),
            split,
            timing,
            clock,
        }
    }

    pub fn from_config(config: &GameConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(ShareSplit::from(config), PayoutTiming::from(config), clock)
    }

    /// Consistent copy of the current state
    pub fn read(&self) -> PublicState {
        self.snapshot().as_ref().clone()
    }

    /// Shared handle to the current snapshot (no copy)
    pub fn snapshot(&self) -> Arc<PublicState> {
        Arc::clone(&self.current.read())
    }

    pub fn timing(&self) -> &PayoutTiming {
        &self.timing
    }

    pub fn split(&self) -> &ShareSplit {
        &self.split
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Apply one mutation and return the post-mutation state.
    ///
    /// Balances are clamped at zero. Any change to the total value, any
    /// payout and any reschedule move the payout deadline to
    /// `now + interval(total_value)`.
    pub fn apply(&self, mutation: &Mutation) -> PublicState {
        let _writer = self.writer.lock();

        let mut next = self.read();
        let now = self.clock.now_ms();

        let deadline = match mutation {
            Mutation::Contribution(ev) => {
                let amount = clamp_money(ev.amount);
                let before = next.total_value;

                next.pool_balance = saturating_money(next.pool_balance + amount * self.split.pool);
                next.owner_balance = saturating_money(next.owner_balance + amount * self.split.owner);
                next.total_value = saturating_money(next.total_value + amount);
                next.last_contributor = Some(Contributor {
                    id: ev.contributor_id.clone(),
                    display_name: ev.display_name.clone(),
                    amount,
                    at: now,
                });

                if next.total_value != before {
                    Deadline::Recompute
                } else {
                    Deadline::Keep
                }
            }
            Mutation::Withdrawal(ev) => {
                let amount = clamp_money(ev.amount);
                let before = next.total_value;

                next.total_value = saturating_money(next.total_value - amount);

                if next.total_value != before {
                    Deadline::Recompute
                } else {
                    Deadline::Keep
                }
            }
            Mutation::Payout(ev) => {
                let payout = clamp_money(ev.suggested_payout);
                next.owner_balance = saturating_money(next.owner_balance - payout);
                Deadline::Recompute
            }
            Mutation::Reschedule { interval_ms: None } => Deadline::Recompute,
            Mutation::Reschedule {
                interval_ms: Some(ms),
            } => Deadline::Fixed(*ms),
        };

        match deadline {
            Deadline::Keep => {
                // An overdue deadline is never published in the past.
                next.next_payout_at = next.next_payout_at.max(now);
            }
            Deadline::Recompute => {
                let interval = self.timing.interval_ms(next.total_value);
                next.payout_interval_ms = interval;
                next.next_payout_at = now.saturating_add(interval);
            }
            Deadline::Fixed(interval) => {
                next.payout_interval_ms = interval;
                next.next_payout_at = now.saturating_add(interval);
            }
        }

        log::trace!(
            "[State] {} applied: total={:.2} pool={:.2} owner={:.2} next_payout_at={}",
            mutation.name(),
            next.total_value,
            next.pool_balance,
            next.owner_balance,
            next.next_payout_at
        );

        *self.current.write() = Arc::new(next.clone());
        next
    }
}
