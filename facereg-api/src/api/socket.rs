//! WebSocket push channel (`GET /ws`)
//!
//! Each text frame is one `{"event", "data"}` envelope. A connection gets a
//! reader loop (this task), a writer task draining the outbound queue, and a
//! [`PushSession`] owning the recognition worker.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use facereg_common::events::{ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::push::PushSession;
use crate::AppState;

const OUTBOUND_CAPACITY: usize = 32;

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(%connection_id, "Push client connected");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to serialize {} event: {}", event.event_name(), e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let session = PushSession::start(state, tx);

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => session.handle(event),
                Err(e) => warn!(%connection_id, "Ignoring malformed push frame: {}", e),
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                warn!(%connection_id, "Ignoring binary push frame");
            }
            Ok(_) => {}
            Err(e) => {
                debug!(%connection_id, "Push socket read failed: {}", e);
                break;
            }
        }
    }

    let dropped_frames = session.coalesced_frames();
    // Cancels the recognition worker and any unanswered register/chat tasks
    drop(session);
    writer.abort();

    info!(%connection_id, dropped_frames, "Push client disconnected");
}
