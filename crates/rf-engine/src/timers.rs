//! One-shot cancellable timer
//!
//! Each arm spawns a tokio task that sleeps and then reports a
//! [`TimerFired`] tagged with the epoch it was armed under. Re-arming aborts
//! the previous task and bumps the epoch, so a fire that was already queued
//! before the abort can be recognised as stale by the receiver.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A timer fire, tagged with the epoch it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub epoch: u64,
}

pub struct TimerSlot {
    epoch: u64,
    handle: Option<JoinHandle<()>>,
    fire_tx: mpsc::Sender<TimerFired>,
}

impl TimerSlot {
    pub fn new(fire_tx: mpsc::Sender<TimerFired>) -> Self {
        Self {
            epoch: 0,
            handle: None,
            fire_tx,
        }
    }

    /// Cancel whatever is pending and fire once after `delay`.
    ///
    /// Returns the new epoch.
    pub fn arm(&mut self, delay: Duration) -> u64 {
        self.cancel();
        self.epoch += 1;

        let epoch = self.epoch;
        let fire_tx = self.fire_tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fire_tx.send(TimerFired { epoch }).await;
        }));

        log::trace!("[Timer] Armed epoch {} for {:?}", epoch, delay);
        epoch
    }

    /// Abort the pending task. No-op when nothing is armed.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::trace!("[Timer] Cancelled epoch {}", self.epoch);
        }
    }

    /// Accept a fire if it belongs to the armed epoch, disarming the slot.
    pub fn take_fire(&mut self, fired: TimerFired) -> bool {
        if self.handle.is_some() && fired.epoch == self.epoch {
            self.handle = None;
            true
        } else {
            false
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_with_epoch() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut slot = TimerSlot::new(tx);

        let epoch = slot.arm(Duration::from_millis(500));
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, TimerFired { epoch });
        assert!(slot.take_fire(fired));
        assert!(!slot.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut slot = TimerSlot::new(tx);

        slot.arm(Duration::from_secs(10));
        let second = slot.arm(Duration::from_secs(1));

        let fired = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fired.epoch, second);

        // The aborted first timer never reports.
        assert!(
            tokio::time::timeout(Duration::from_secs(30), rx.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fire_rejected() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut slot = TimerSlot::new(tx);

        let first = slot.arm(Duration::from_millis(10));
        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.epoch, first);

        // Re-armed before the queued fire was handled.
        slot.arm(Duration::from_secs(5));
        assert!(!slot.take_fire(queued));
        assert!(slot.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut slot = TimerSlot::new(tx);

        slot.arm(Duration::from_millis(50));
        slot.cancel();
        assert!(!slot.is_armed());
        assert!(
            tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .is_err()
        );
    }
}
