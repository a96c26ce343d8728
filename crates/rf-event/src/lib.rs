//! ReelFire Event System
//!
//! Typed publish/subscribe between the state writer and every live viewer:
//! - `GameEvent`: the wire vocabulary (`state`, `buy`, `sell`, `win`, `tick`)
//! - `Submission`: validated inbound buy/sell requests
//! - `EventBus`: fan-out with one bounded queue per subscriber
//! - `frame`: newline-delimited JSON framing
//!
//! ## Architecture
//!
//! ```text
//!   Writer task                         Transport adapters
//!   ┌──────────────┐   publish()   ┌──────────────────────────┐
//!   │ apply()      │──────────────▶│ Subscription (queue N)   │──▶ client A
//!   │ re-arm timer │    EventBus   │ Subscription (queue N)   │──▶ client B
//!   │              │               │ Subscription (full) ✗    │    dropped
//!   └──────────────┘               └──────────────────────────┘
//! ```
//!
//! `publish` never waits on a subscriber. A subscriber whose queue is full is
//! disconnected; it drains what it already has and then sees end-of-stream.

pub mod bus;
pub mod event;
pub mod frame;
pub mod inbound;

pub use bus::{BusStats, EventBus, SubscriberId, Subscription};
pub use event::GameEvent;
pub use frame::{decode_frame, encode_frame};
pub use inbound::{BuyLimits, Submission, parse_amount};
