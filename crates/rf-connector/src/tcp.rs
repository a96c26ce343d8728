//! Line-oriented TCP push server
//!
//! Each accepted connection gets the current state as its first line and then
//! every bus event, one JSON object per line. Anything the client sends is
//! read and discarded; EOF from the client closes the connection. A client
//! that stops reading is dropped after [`WRITE_TIMEOUT`] or at shutdown,
//! whichever comes first.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rf_core::{RfError, RfResult};
use rf_engine::EngineHandle;
use rf_event::{GameEvent, encode_frame};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::shutdown::Shutdown;

/// Longest a single line may take to reach the client's socket
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Accept connections on `listener` until `shutdown` fires.
pub async fn serve_tcp(
    listener: TcpListener,
    engine: EngineHandle,
    shutdown: Shutdown,
) -> RfResult<()> {
    let addr = listener.local_addr()?;
    log::info!("[Tcp] Push server listening on {}", addr);

    let stop = shutdown.clone().wait();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let engine = engine.clone();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = push_lines(stream, peer, engine, shutdown).await {
                            log::debug!("[Tcp] {} dropped: {}", peer, e);
                        }
                    });
                }
                Err(e) => log::warn!("[Tcp] Accept failed: {}", e),
            },
            _ = &mut stop => break,
        }
    }

    log::info!("[Tcp] Stopped");
    Ok(())
}

async fn push_lines(
    stream: TcpStream,
    peer: SocketAddr,
    engine: EngineHandle,
    shutdown: Shutdown,
) -> RfResult<()> {
    let (snapshot, mut subscription) = engine.connect();
    log::debug!("[Tcp] {} connected as subscriber {}", peer, subscription.id());

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut discard = String::new();

    let stop = shutdown.wait();
    tokio::pin!(stop);

    let mut pending = Some(Arc::new(GameEvent::state(snapshot)));
    loop {
        if let Some(event) = pending.take() {
            tokio::select! {
                written = write_event(&mut write_half, &event) => written?,
                _ = &mut stop => break,
            }
        }

        tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => pending = Some(event),
                None => break,
            },
            read = reader.read_line(&mut discard) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => discard.clear(),
            },
            _ = &mut stop => break,
        }
    }

    log::debug!("[Tcp] {} disconnected", peer);
    Ok(())
}

async fn write_event<W>(write: &mut W, event: &GameEvent) -> RfResult<()>
where
    W: AsyncWrite + Unpin,
{
    let line = encode_frame(event)?;
    tokio::time::timeout(WRITE_TIMEOUT, write.write_all(line.as_bytes()))
        .await
        .map_err(|_| RfError::Transport(format!("write stalled for {WRITE_TIMEOUT:?}")))?
        .map_err(|e| RfError::Transport(e.to_string()))
}
