//! ReelFire Motion
//!
//! Visual reel state, advanced by an externally supplied tick:
//!
//! ```text
//!   Idle ──spin──> Spinning ──stop delay──> Decelerating ──v ≤ idle──> Aligning
//!    ^                                                                   │
//!    └──────────── cool-down ──── Stopped <──── within tolerance ────────┘
//! ```
//!
//! Each [`Lane`] owns its symbols, velocity and RNG, so lanes never share
//! mutable state. [`MotionController`] holds the lanes, forwards ticks and
//! scores each settled spin as a [`SpinOutcome`].

mod controller;
mod lane;
mod outcome;
mod params;

pub use controller::MotionController;
pub use lane::{Lane, LaneStop, MotionState, StripSymbol};
pub use outcome::SpinOutcome;
pub use params::MotionParams;
