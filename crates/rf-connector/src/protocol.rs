//! Viewer connection settings

use serde::{Deserialize, Serialize};

/// How a viewer reaches the push feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    /// WebSocket endpoint (`ws://host:port/api/ws`)
    WebSocket { url: String },
    /// Line-oriented TCP push server
    Tcp { host: String, port: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub protocol: Protocol,
    /// Connection timeout in milliseconds
    pub timeout_ms: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Tcp {
                host: "127.0.0.1".to_string(),
                port: 8788,
            },
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    /// Connection lost with an error
    Error,
}
