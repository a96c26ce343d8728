//! Newline-delimited JSON framing

use rf_core::{RfError, RfResult};

use crate::event::GameEvent;

/// Encode one event as a single line, trailing `\n` included
pub fn encode_frame(event: &GameEvent) -> RfResult<String> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    Ok(line)
}

/// Decode one line (surrounding whitespace ignored)
pub fn decode_frame(line: &str) -> RfResult<GameEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(RfError::Transport("empty frame".into()));
    }
    Ok(serde_json::from_str(trimmed)?)
}
