//! HTTP adapter (axum)

use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::{SinkExt, StreamExt, stream};
use rf_core::{RfError, RfResult};
use rf_engine::EngineHandle;
use rf_event::{GameEvent, Submission, encode_frame};
use serde_json::json;
use tokio::net::TcpListener;

use crate::shutdown::Shutdown;

#[derive(Clone)]
struct AppState {
    engine: EngineHandle,
    shutdown: Shutdown,
}

pub fn router(engine: EngineHandle, shutdown: Shutdown) -> Router {
    Router::new()
        .route("/api/ingest", post(ingest))
        .route("/api/state", get(state))
        .route("/api/stream", get(ndjson_stream))
        .route("/api/ws", get(websocket))
        .with_state(AppState { engine, shutdown })
}

/// Serve the router on `listener` until `shutdown` fires.
pub async fn serve_http(
    listener: TcpListener,
    engine: EngineHandle,
    shutdown: Shutdown,
) -> RfResult<()> {
    let addr = listener.local_addr()?;
    log::info!("[Http] Listening on http://{}", addr);

    let app = router(engine, shutdown.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    log::info!("[Http] Stopped");
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
// POST /api/ingest
// ═══════════════════════════════════════════════════════════════

async fn ingest(State(st): State<AppState>, body: Bytes) -> Response {
    let submitted = match serde_json::from_slice(&body) {
        Ok(value) => match Submission::from_value(value) {
            Ok(submission) => st.engine.submit(submission).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(RfError::Validation(format!("body is not JSON: {e}"))),
    };

    match submitted {
        Ok(state) => (StatusCode::OK, Json(json!({ "ok": true, "state": state }))).into_response(),
        Err(e) => {
            let status = if e.is_client_error() {
                log::debug!("[Http] Rejected submission: {}", e);
                StatusCode::BAD_REQUEST
            } else {
                log::error!("[Http] Ingest failed: {}", e);
                StatusCode::SERVICE_UNAVAILABLE
            };
            (status, Json(json!({ "ok": false, "error": e.to_string() }))).into_response()
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// GET /api/state
// ═══════════════════════════════════════════════════════════════

async fn state(State(st): State<AppState>) -> impl IntoResponse {
    Json(st.engine.state())
}

// ═══════════════════════════════════════════════════════════════
// GET /api/stream
// ═══════════════════════════════════════════════════════════════

async fn ndjson_stream(State(st): State<AppState>) -> impl IntoResponse {
    let (snapshot, subscription) = st.engine.connect();
    log::debug!("[Http] Stream subscriber {} connected", subscription.id());

    let first = stream::once(async move { Arc::new(GameEvent::state(snapshot)) });
    let frames = first
        .chain(subscription.into_stream())
        .take_until(st.shutdown.wait())
        .map(|event| encode_frame(&event));

    (
        [
            (header::CONTENT_TYPE, "application/x-ndjson"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames),
    )
}

// ═══════════════════════════════════════════════════════════════
// GET /api/ws
// ═══════════════════════════════════════════════════════════════

async fn websocket(State(st): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| push_websocket(socket, st))
}

async fn push_websocket(socket: WebSocket, st: AppState) {
    let (snapshot, mut subscription) = st.engine.connect();
    let id = subscription.id();
    let (mut write, mut read) = socket.split();
    let shutdown = st.shutdown.wait();
    tokio::pin!(shutdown);

    let mut next = Some(Arc::new(GameEvent::state(snapshot)));
    loop {
        if let Some(event) = next.take() {
            if let Err(e) = send_ws(&mut write, &event).await {
                log::debug!("[Http] WebSocket {} dropped: {}", id, e);
                break;
            }
        }

        tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => next = Some(event),
                None => break,
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Viewers only listen
                Some(Ok(_)) => {}
            },
            _ = &mut shutdown => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }
    log::debug!("[Http] WebSocket {} closed", id);
}

async fn send_ws<S>(write: &mut S, event: &GameEvent) -> RfResult<()>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(event)?;
    write
        .send(Message::Text(json))
        .await
        .map_err(|e| RfError::Transport(e.to_string()))
}
