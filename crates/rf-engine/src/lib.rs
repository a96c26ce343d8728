//! ReelFire Engine
//!
//! Owns the single writer of the game state. Every mutation, whether it comes
//! from a submission, a payout timer or a scheduler fault, is applied on one
//! task and then fanned out on the [`EventBus`]:
//!
//! ```text
//!   submit() ─┐
//!             ├─> writer task ─> StateStore::apply ─> JackpotScheduler::sync
//!   timer  ───┤                                    └─> EventBus::publish
//!   heartbeat ┘
//! ```
//!
//! [`EventBus`]: rf_event::EventBus

mod clock;
mod engine;
pub mod mock;
mod scheduler;
mod timers;

pub use clock::TokioClock;
pub use engine::{EngineHandle, GameEngine};
pub use mock::{MockFeed, MockSettings};
pub use scheduler::JackpotScheduler;
pub use timers::{TimerFired, TimerSlot};
