//! rf-core: Shared types for ReelFire
//!
//! Clock and money primitives, the error taxonomy and the game configuration
//! used by every other ReelFire crate.

mod config;
mod error;
mod time;

pub use config::*;
pub use error::*;
pub use time::*;
