//! JackpotScheduler: keeps exactly one payout timer armed
//!
//! The deadline itself lives in [`PublicState::next_payout_at`] and is moved by
//! `StateStore::apply`. The scheduler only follows it: whenever the published
//! deadline differs from the one it armed for, the old timer is cancelled and a
//! new one is armed for `max(min_delay, next_payout_at - now)`.

use std::time::Duration;

use rf_core::{GameConfig, RfError, RfResult, Timestamp};
use rf_state::{PayoutEvent, PublicState};
use tokio::sync::mpsc;

use crate::timers::{TimerFired, TimerSlot};

pub struct JackpotScheduler {
    timer: TimerSlot,
    /// Deadline the pending timer was armed for
    armed_for: Option<Timestamp>,
    /// Interval of the last deadline that was armed successfully
    last_good_interval: u64,
    payout_fraction: f64,
    min_delay_ms: u64,
}

impl JackpotScheduler {
    pub fn new(config: &GameConfig, fire_tx: mpsc::Sender<TimerFired>) -> Self {
        Self {
            timer: TimerSlot::new(fire_tx),
            armed_for: None,
            last_good_interval: config.base_interval,
            payout_fraction: config.payout_fraction,
            min_delay_ms: config.min_timer_delay_ms,
        }
    }

    /// Re-arm if `state` carries a deadline other than the armed one.
    ///
    /// Returns true when a new timer was armed.
    pub fn sync(&mut self, state: &PublicState, now: Timestamp) -> bool {
        if self.armed_for == Some(state.next_payout_at) && self.timer.is_armed() {
            return false;
        }

        let delay_ms = state
            .next_payout_at
            .saturating_sub(now)
            .max(self.min_delay_ms);
        let epoch = self.timer.arm(Duration::from_millis(delay_ms));
        self.armed_for = Some(state.next_payout_at);
        if state.payout_interval_ms > 0 {
            self.last_good_interval = state.payout_interval_ms;
        }

        log::debug!(
            "[Scheduler] Armed epoch {} in {} ms (deadline {})",
            epoch,
            delay_ms,
            state.next_payout_at
        );
        true
    }

    /// Accept `fired` if it belongs to the current epoch. Stale fires from a
    /// replaced timer return false and must be ignored.
    pub fn accept(&mut self, fired: TimerFired) -> bool {
        if self.timer.take_fire(fired) {
            self.armed_for = None;
            true
        } else {
            log::debug!(
                "[Scheduler] Ignoring stale fire (epoch {} != {})",
                fired.epoch,
                self.timer.epoch()
            );
            false
        }
    }

    /// Payout for the current winner, if there is one.
    pub fn compute_payout(&self, state: &PublicState) -> RfResult<Option<PayoutEvent>> {
        let Some(winner) = state.last_contributor.as_ref() else {
            return Ok(None);
        };

        let suggested = state.owner_balance * self.payout_fraction;
        if !suggested.is_finite() || suggested < 0.0 {
            return Err(RfError::SchedulerFault(format!(
                "payout for {} evaluated to {}",
                winner.id, suggested
            )));
        }

        Ok(Some(PayoutEvent {
            winner_id: winner.id.clone(),
            suggested_payout: suggested,
        }))
    }

    /// Interval to fall back on after a fault
    pub fn last_good_interval(&self) -> u64 {
        self.last_good_interval
    }

    pub fn armed_for(&self) -> Option<Timestamp> {
        self.armed_for
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.armed_for = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rf_state::Contributor;

    fn state_at(next_payout_at: Timestamp, interval: u64) -> PublicState {
        PublicState {
            next_payout_at,
            payout_interval_ms: interval,
            ..PublicState::initial(0, interval)
        }
    }

    fn scheduler() -> (JackpotScheduler, mpsc::Receiver<TimerFired>) {
        let (tx, rx) = mpsc::channel(4);
        (JackpotScheduler::new(&GameConfig::default(), tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_only_rearms_on_new_deadline() {
        let (mut sched, _rx) = scheduler();

        assert!(sched.sync(&state_at(22_000, 22_000), 0));
        assert!(!sched.sync(&state_at(22_000, 22_000), 5_000));
        assert!(sched.sync(&state_at(30_000, 22_000), 8_000));
        assert_eq!(sched.armed_for(), Some(30_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overdue_deadline_uses_min_delay() {
        let (mut sched, mut rx) = scheduler();
        let start = tokio::time::Instant::now();

        sched.sync(&state_at(1_000, 22_000), 50_000);
        let fired = rx.recv().await.unwrap();
        assert!(sched.accept(fired));
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(1_000));
        assert!(waited < Duration::from_millis(1_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_epoch_ignored() {
        let (mut sched, mut rx) = scheduler();

        sched.sync(&state_at(2_000, 2_000), 0);
        let stale = rx.recv().await.unwrap();
        sched.sync(&state_at(90_000, 88_000), 2_000);

        assert!(!sched.accept(stale));
        assert_eq!(sched.armed_for(), Some(90_000));
        assert_eq!(sched.last_good_interval(), 88_000);
    }

    #[test]
    fn test_payout_is_fraction_of_owner_balance() {
        let (tx, _rx) = mpsc::channel(1);
        let sched = JackpotScheduler::new(&GameConfig::default(), tx);

        let mut state = state_at(0, 22_000);
        assert!(sched.compute_payout(&state).unwrap().is_none());

        state.owner_balance = 100.0;
        state.last_contributor = Some(Contributor {
            id: "7xKq".into(),
            display_name: None,
            amount: 5_000.0,
            at: 0,
        });
        let payout = sched.compute_payout(&state).unwrap().unwrap();
        assert_eq!(payout.winner_id, "7xKq");
        assert_relative_eq!(payout.suggested_payout, 50.0);
    }

    #[test]
    fn test_non_finite_payout_is_fault() {
        let (tx, _rx) = mpsc::channel(1);
        let config = GameConfig {
            payout_fraction: f64::NAN,
            ..GameConfig::default()
        };
        let sched = JackpotScheduler::new(&config, tx);

        let mut state = state_at(0, 22_000);
        state.last_contributor = Some(Contributor {
            id: "x".into(),
            display_name: None,
            amount: 1.0,
            at: 0,
        });
        assert!(matches!(
            sched.compute_payout(&state),
            Err(RfError::SchedulerFault(_))
        ));
    }
}
