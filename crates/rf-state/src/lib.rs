//! rf-state: authoritative game state for ReelFire
//!
//! - `StateStore`: the single writer of [`PublicState`]
//! - `schedule`: the adaptive payout deadline function
//! - `model`: state, contributor and domain event types

pub mod model;
pub mod schedule;
pub mod store;

pub use model::*;
pub use schedule::*;
pub use store::*;
