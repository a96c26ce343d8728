//! Viewer connector — TCP/WebSocket client for the push feed

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rf_core::{RfError, RfResult};
use rf_event::{GameEvent, decode_frame};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::protocol::{ConnectionConfig, ConnectionState, Protocol};

/// Live connection to a ReelFire push feed
pub struct ViewerConnector {
    config: ConnectionConfig,

    state: Arc<RwLock<ConnectionState>>,

    /// Decoded events from the feed
    event_tx: broadcast::Sender<GameEvent>,

    connection_handle: Option<tokio::task::JoinHandle<()>>,

    shutdown_tx: broadcast::Sender<()>,
}

impl ViewerConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            event_tx,
            connection_handle: None,
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Subscribe before [`Self::connect`] to see the initial `state` frame.
    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.event_tx.subscribe()
    }

    pub async fn connect(&mut self) -> RfResult<()> {
        if self.connection_handle.is_some() {
            return Err(RfError::Transport("already connected".into()));
        }
        *self.state.write().await = ConnectionState::Connecting;

        let protocol = self.config.protocol.clone();
        let result = match protocol {
            Protocol::WebSocket { url } => self.connect_websocket(&url).await,
            Protocol::Tcp { host, port } => self.connect_tcp(&host, port).await,
        };

        *self.state.write().await = match result {
            Ok(()) => ConnectionState::Connected,
            Err(_) => ConnectionState::Error,
        };
        result
    }

    pub async fn disconnect(&mut self) {
        *self.state.write().await = ConnectionState::Disconnecting;
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.connection_handle.take() {
            let _ = handle.await;
        }
        *self.state.write().await = ConnectionState::Disconnected;
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms as u64)
    }

    async fn connect_websocket(&mut self, url: &str) -> RfResult<()> {
        let _ = url::Url::parse(url)
            .map_err(|e| RfError::Transport(format!("Invalid URL: {}", e)))?;

        let ws_stream = tokio::time::timeout(self.timeout(), connect_async(url))
            .await
            .map_err(|_| RfError::Transport("connection timeout".into()))?
            .map_err(|e| RfError::Transport(format!("WebSocket error: {}", e)))?
            .0;

        let (mut write, mut read) = ws_stream.split();

        let event_tx = self.event_tx.clone();
        let state = Arc::clone(&self.state);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                Self::handle_message(text.as_str(), &event_tx);
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                *state.write().await = ConnectionState::Disconnected;
                                break;
                            }
                            Some(Err(e)) => {
                                log::error!("[Connector] WebSocket error: {}", e);
                                *state.write().await = ConnectionState::Error;
                                break;
                            }
                            _ => {} // Ignore ping/pong/binary
                        }
                    }

                    _ = shutdown_rx.recv() => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        self.connection_handle = Some(handle);
        Ok(())
    }

    async fn connect_tcp(&mut self, host: &str, port: u16) -> RfResult<()> {
        let addr = format!("{}:{}", host, port);

        let stream = tokio::time::timeout(self.timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| RfError::Transport("connection timeout".into()))?
            .map_err(|e| RfError::Transport(format!("{addr}: {e}")))?;

        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let event_tx = self.event_tx.clone();
        let state = Arc::clone(&self.state);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            // Held so the server does not read EOF.
            let _write_half = write_half;
            let mut line = String::new();

            loop {
                tokio::select! {
                    result = reader.read_line(&mut line) => {
                        match result {
                            Ok(0) => {
                                *state.write().await = ConnectionState::Disconnected;
                                break;
                            }
                            Ok(_) => {
                                Self::handle_message(&line, &event_tx);
                                line.clear();
                            }
                            Err(e) => {
                                log::error!("[Connector] TCP read error: {}", e);
                                *state.write().await = ConnectionState::Error;
                                break;
                            }
                        }
                    }

                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        self.connection_handle = Some(handle);
        Ok(())
    }

    fn handle_message(text: &str, event_tx: &broadcast::Sender<GameEvent>) {
        match decode_frame(text) {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(e) => log::warn!("[Connector] Skipping frame: {}", e),
        }
    }
}

/// Connector builder
pub struct ConnectorBuilder {
    config: ConnectionConfig,
}

impl ConnectorBuilder {
    pub fn websocket(url: &str) -> Self {
        Self {
            config: ConnectionConfig {
                protocol: Protocol::WebSocket {
                    url: url.to_string(),
                },
                ..ConnectionConfig::default()
            },
        }
    }

    pub fn tcp(host: &str, port: u16) -> Self {
        Self {
            config: ConnectionConfig {
                protocol: Protocol::Tcp {
                    host: host.to_string(),
                    port,
                },
                ..ConnectionConfig::default()
            },
        }
    }

    /// Set connection timeout
    pub fn timeout(mut self, timeout_ms: u32) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    pub fn build(self) -> ViewerConnector {
        ViewerConnector::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_tcp() {
        let connector = ConnectorBuilder::tcp("localhost", 9090).timeout(3000).build();
        assert_eq!(connector.state().await, ConnectionState::Disconnected);
        assert_eq!(connector.config().timeout_ms, 3000);
        match &connector.config().protocol {
            Protocol::Tcp { host, port } => {
                assert_eq!(host, "localhost");
                assert_eq!(*port, 9090);
            }
            other => panic!("Expected TCP protocol, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_websocket_url() {
        let mut connector = ConnectorBuilder::websocket("not a url").build();
        assert!(matches!(connector.connect().await, Err(RfError::Transport(_))));
        assert_eq!(connector.state().await, ConnectionState::Error);
    }

    #[tokio::test]
    async fn test_refused_tcp() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut connector = ConnectorBuilder::tcp("127.0.0.1", port).timeout(1000).build();
        assert!(connector.connect().await.is_err());
    }

    #[test]
    fn test_bad_frames_are_skipped() {
        let (tx, mut rx) = broadcast::channel(4);
        ViewerConnector::handle_message("{oops", &tx);
        ViewerConnector::handle_message("{\"type\":\"tick\",\"t\":5}\n", &tx);
        assert_eq!(rx.try_recv().unwrap(), GameEvent::Tick { t: 5 });
        assert!(rx.try_recv().is_err());
    }
}
