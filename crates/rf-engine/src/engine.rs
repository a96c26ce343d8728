//! Game engine: the writer task and its handle
//!
//! All state changes run on one task. Submissions arrive over a command
//! channel, payout timers over a fire channel, and a heartbeat interval keeps
//! idle connections alive. For every change the writer applies the mutation,
//! lets the scheduler follow the new deadline, then publishes the raw event
//! followed by the post-mutation snapshot.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use rf_core::{Clock, GameConfig, RfError, RfResult};
use rf_event::{BuyLimits, EventBus, GameEvent, Submission, Subscription};
use rf_state::{Mutation, PublicState, StateStore};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

use crate::scheduler::JackpotScheduler;
use crate::timers::TimerFired;

const COMMAND_QUEUE: usize = 1024;
const TIMER_QUEUE: usize = 8;

enum Command {
    Submit {
        submission: Submission,
        reply: oneshot::Sender<PublicState>,
    },
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// GAME ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct GameEngine;

impl GameEngine {
    /// Validate `config` and start the writer task on the current runtime.
    pub fn spawn(config: &GameConfig, clock: Arc<dyn Clock>) -> RfResult<EngineHandle> {
        config.validate()?;
        Ok(Self::spawn_unchecked(config, clock))
    }

    pub(crate) fn spawn_unchecked(config: &GameConfig, clock: Arc<dyn Clock>) -> EngineHandle {
        let (writer, handle) = Self::assemble(config, clock);
        tokio::spawn(writer.run());

        log::info!(
            "[Engine] Started (base interval {} ms, heartbeat {} ms)",
            config.base_interval,
            config.heartbeat_ms
        );
        handle
    }

    fn assemble(config: &GameConfig, clock: Arc<dyn Clock>) -> (Writer, EngineHandle) {
        let store = Arc::new(StateStore::from_config(config, clock));
        let bus = EventBus::new(config.subscriber_queue);

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let (fire_tx, fire_rx) = mpsc::channel(TIMER_QUEUE);

        let writer = Writer {
            store: Arc::clone(&store),
            bus: bus.clone(),
            scheduler: JackpotScheduler::new(config, fire_tx),
            cmd_rx,
            fire_rx,
            heartbeat: Duration::from_millis(config.heartbeat_ms.max(1)),
            #[cfg(test)]
            payout_hook: None,
        };
        let handle = EngineHandle {
            cmd_tx,
            store,
            bus,
            limits: BuyLimits::from(config),
        };
        (writer, handle)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Cloneable access to a running engine
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<Command>,
    store: Arc<StateStore>,
    bus: EventBus,
    limits: BuyLimits,
}

impl EngineHandle {
    /// Apply a validated submission and return the state right after it.
    ///
    /// Buys outside the configured bounds are rejected before they reach
    /// the writer.
    pub async fn submit(&self, submission: Submission) -> RfResult<PublicState> {
        self.limits.check(&submission)?;
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Submit { submission, reply })
            .await
            .map_err(|_| RfError::EngineClosed)?;
        rx.await.map_err(|_| RfError::EngineClosed)
    }

    /// Validate a raw JSON submission, then [`Self::submit`] it.
    pub async fn submit_json(&self, value: serde_json::Value) -> RfResult<PublicState> {
        let submission = Submission::from_value(value)?;
        self.submit(submission).await
    }

    pub fn state(&self) -> PublicState {
        self.store.read()
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Subscribe, then read the state to send as the first frame.
    ///
    /// Subscribing first means no change between the two steps is lost.
    pub fn connect(&self) -> (PublicState, Subscription) {
        let subscription = self.bus.subscribe();
        (self.store.read(), subscription)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn now_ms(&self) -> u64 {
        self.store.now_ms()
    }

    pub fn is_running(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    /// Stop the writer and cancel the pending payout timer.
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.cmd_tx.send(Command::Shutdown { ack }).await.is_ok() {
            let _ = done.await;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WRITER TASK
// ═══════════════════════════════════════════════════════════════════════════════

struct Writer {
    store: Arc<StateStore>,
    bus: EventBus,
    scheduler: JackpotScheduler,
    cmd_rx: mpsc::Receiver<Command>,
    fire_rx: mpsc::Receiver<TimerFired>,
    heartbeat: Duration,
    /// Runs before every payout computation
    #[cfg(test)]
    payout_hook: Option<fn(&PublicState)>,
}

impl Writer {
    async fn run(mut self) {
        let initial = self.store.read();
        self.scheduler.sync(&initial, self.store.now_ms());

        let mut heartbeat = tokio::time::interval_at(Instant::now() + self.heartbeat, self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut shutdown_ack = None;
        loop {
            tokio::select! {
                biased;

                Some(fired) = self.fire_rx.recv() => {
                    self.on_timer(fired);
                }

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Submit { submission, reply }) => {
                        let state = self.on_submit(submission);
                        let _ = reply.send(state);
                    }
                    Some(Command::Shutdown { ack }) => {
                        shutdown_ack = Some(ack);
                        break;
                    }
                    None => break,
                },

                _ = heartbeat.tick() => {
                    self.bus.publish(GameEvent::Tick { t: self.store.now_ms() });
                }
            }
        }

        self.scheduler.cancel();
        self.cmd_rx.close();
        log::info!("[Engine] Writer stopped");
        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    fn on_submit(&mut self, submission: Submission) -> PublicState {
        let state = self.store.apply(&submission.to_mutation());
        self.scheduler.sync(&state, self.store.now_ms());

        log::debug!(
            "[Engine] {} {:.2} -> total {:.2}",
            submission.kind(),
            submission.amount(),
            state.total_value
        );

        self.bus.publish(submission.to_event());
        self.bus.publish(GameEvent::state(state.clone()));
        state
    }

    fn on_timer(&mut self, fired: TimerFired) {
        if !self.scheduler.accept(fired) {
            return;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| self.run_payout()));
        let fault = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(panic) => RfError::SchedulerFault(panic_message(panic.as_ref())),
        };
        self.recover(fault);
    }

    fn run_payout(&mut self) -> RfResult<()> {
        let current = self.store.read();
        #[cfg(test)]
        if let Some(hook) = self.payout_hook {
            hook(&current);
        }

        let state = match self.scheduler.compute_payout(&current)? {
            Some(win) => {
                let state = self.store.apply(&Mutation::Payout(win.clone()));
                self.scheduler.sync(&state, self.store.now_ms());
                log::info!(
                    "[Engine] Jackpot: {} wins {:.2}",
                    win.winner_id,
                    win.suggested_payout
                );
                self.bus.publish(GameEvent::Win(win));
                state
            }
            None => {
                let state = self.store.apply(&Mutation::Reschedule { interval_ms: None });
                self.scheduler.sync(&state, self.store.now_ms());
                log::debug!("[Engine] No contributor yet, deadline moved to {}", state.next_payout_at);
                state
            }
        };

        self.bus.publish(GameEvent::state(state));
        Ok(())
    }

    /// Keep the game going after a failed payout: push the deadline out by
    /// the last good interval and re-arm.
    fn recover(&mut self, fault: RfError) {
        let interval = self.scheduler.last_good_interval();
        log::error!(
            "[Engine] Payout failed ({}), rescheduling in {} ms",
            fault,
            interval
        );

        let state = self.store.apply(&Mutation::Reschedule {
            interval_ms: Some(interval),
        });
        self.scheduler.sync(&state, self.store.now_ms());
        self.bus.publish(GameEvent::state(state));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "payout panicked".to_string()
    }
}
