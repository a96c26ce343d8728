//! Error types for ReelFire

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum RfError {
    /// Malformed inbound submission. Nothing was applied.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A push connection could not be written to.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A jackpot timer callback failed.
    #[error("Scheduler fault: {0}")]
    SchedulerFault(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Engine is not running")]
    EngineClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RfError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias
pub type RfResult<T> = Result<T, RfError>;
