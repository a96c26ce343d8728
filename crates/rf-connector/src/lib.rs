//! # rf-connector — ReelFire transport adapters
//!
//! Everything that touches a socket:
//!
//! - `http`: axum router with `POST /api/ingest`, `GET /api/state`,
//!   `GET /api/stream` (ndjson) and `GET /api/ws` (WebSocket)
//! - `tcp`: line-oriented push server, one JSON object per line
//! - `connector`: viewer client for the TCP and WebSocket feeds
//!
//! Every push connection subscribes to the engine's bus before it reads the
//! state it sends first, and drops its subscription on the first failed write.

pub mod connector;
pub mod http;
pub mod protocol;
pub mod shutdown;
pub mod tcp;

pub use connector::{ConnectorBuilder, ViewerConnector};
pub use http::{router, serve_http};
pub use protocol::{ConnectionConfig, ConnectionState, Protocol};
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
pub use tcp::serve_tcp;
