//! Chat service link
//!
//! One long-lived connection to the chat collaborator, shared by every client
//! connection. Each question carries a fresh `request_id`; the dispatcher task
//! routes each `chat_response`/`chat_error` to the question with the same id,
//! so concurrent questions never receive each other's answers.
//!
//! Lifecycle: opened in `main` before the server starts, closed during
//! graceful shutdown. When the link closes (either side), every pending
//! question fails with [`ChatFailure::Disconnected`].

use facereg_common::events::ChatUpstreamEvent;
use facereg_common::ChatAnswer;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::inference_client::UpstreamError;

const CHANNEL_CAPACITY: usize = 64;

pub const NO_MESSAGE_MESSAGE: &str = "No message provided";
pub const CHAT_FAILED_MESSAGE: &str = "Error processing your message";
pub const DISCONNECTED_MESSAGE: &str = "Chat service disconnected";

/// Why a chat question produced no answer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChatFailure {
    /// Question was empty
    #[error("No message provided")]
    EmptyMessage,

    /// Chat service answered with `chat_error`; message is forwarded
    #[error("Chat service error: {0}")]
    Rejected(String),

    /// Link closed while the question was pending
    #[error("Chat service disconnected")]
    Disconnected,

    /// No link configured, or link already closed
    #[error("Chat service unavailable")]
    Unavailable,
}

impl ChatFailure {
    /// Text for the client's `chat_error` event
    pub fn public_message(&self) -> String {
        match self {
            ChatFailure::EmptyMessage => NO_MESSAGE_MESSAGE.to_string(),
            ChatFailure::Rejected(msg) => msg.clone(),
            ChatFailure::Disconnected => DISCONNECTED_MESSAGE.to_string(),
            ChatFailure::Unavailable => CHAT_FAILED_MESSAGE.to_string(),
        }
    }
}

type Reply = Result<ChatAnswer, ChatFailure>;

struct ChatLinkInner {
    outbound: mpsc::Sender<ChatUpstreamEvent>,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<Reply>>>,
    open: AtomicBool,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChatLinkInner {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<Uuid, oneshot::Sender<Reply>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve(&self, request_id: Uuid, reply: Reply) {
        let sender = self.lock_pending().remove(&request_id);
        match sender {
            Some(tx) => {
                // Receiver gone means the asking client disconnected
                if tx.send(reply).is_err() {
                    debug!(%request_id, "Chat reply arrived after requester left");
                }
            }
            None => warn!(%request_id, "No pending chat request for reply"),
        }
    }

    fn route(&self, event: ChatUpstreamEvent) {
        match event {
            ChatUpstreamEvent::ChatResponse {
                request_id: Some(request_id),
                answer,
                sources,
            } => self.resolve(request_id, Ok(ChatAnswer { answer, sources })),
            ChatUpstreamEvent::ChatError {
                request_id: Some(request_id),
                message,
            } => self.resolve(request_id, Err(ChatFailure::Rejected(message))),
            ChatUpstreamEvent::ChatResponse { request_id: None, .. }
            | ChatUpstreamEvent::ChatError { request_id: None, .. } => {
                warn!("Dropping chat reply without request_id")
            }
            ChatUpstreamEvent::ChatMessage { request_id, .. } => {
                warn!(%request_id, "Unexpected chat_message from chat service")
            }
        }
    }

    /// Mark closed and fail everything still waiting
    fn fail_all(&self) {
        let drained: Vec<_> = {
            let mut pending = self.lock_pending();
            self.open.store(false, Ordering::SeqCst);
            pending.drain().collect()
        };
        if !drained.is_empty() {
            warn!(count = drained.len(), "Failing pending chat requests");
        }
        for (_, tx) in drained {
            let _ = tx.send(Err(ChatFailure::Disconnected));
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
    }
}

/// Removes a pending entry when the asking future completes or is dropped
struct PendingGuard<'a> {
    inner: &'a ChatLinkInner,
    request_id: Uuid,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.inner.lock_pending().remove(&self.request_id);
    }
}

/// Handle to the chat collaborator; clones share one connection
#[derive(Clone)]
pub struct ChatLink {
    inner: Arc<ChatLinkInner>,
}

impl ChatLink {
    /// Connect to the chat service over WebSocket
    pub async fn connect(url: &str) -> Result<Self, UpstreamError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;
        let (mut ws_sink, mut ws_stream) = ws.split();

        let (out_tx, mut out_rx) = mpsc::channel::<ChatUpstreamEvent>(CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<ChatUpstreamEvent>(CHANNEL_CAPACITY);
        let link = Self::from_channels(out_tx, in_rx);

        let token = link.inner.shutdown.clone();
        let writer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        let _ = ws_sink.send(WsMessage::Close(None)).await;
                        break;
                    }
                    event = out_rx.recv() => {
                        let Some(event) = event else { break };
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("Failed to serialize chat event: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(WsMessage::Text(text)).await {
                            warn!("Chat service write failed: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        let token = link.inner.shutdown.clone();
        let reader = tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = token.cancelled() => break,
                    message = ws_stream.next() => message,
                };
                match message {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ChatUpstreamEvent>(&text) {
                            Ok(event) => {
                                if in_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Ignoring malformed chat service frame: {}", e),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Chat service closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Chat service read failed: {}", e);
                        break;
                    }
                }
            }
            // Dropping in_tx ends the dispatcher, which fails pending requests
        });

        link.inner.track(writer);
        link.inner.track(reader);
        info!(url, "Connected to chat service");

        Ok(link)
    }

    /// Build a link over an established event transport
    ///
    /// `outbound` carries questions to the chat service; `inbound` yields its
    /// replies. The link is closed when `inbound` ends.
    pub fn from_channels(
        outbound: mpsc::Sender<ChatUpstreamEvent>,
        mut inbound: mpsc::Receiver<ChatUpstreamEvent>,
    ) -> Self {
        let inner = Arc::new(ChatLinkInner {
            outbound,
            pending: Mutex::new(HashMap::new()),
            open: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        });

        let dispatcher_inner = Arc::clone(&inner);
        let dispatcher = tokio::spawn(async move {
            let token = dispatcher_inner.shutdown.clone();
            loop {
                let event = tokio::select! {
                    _ = token.cancelled() => break,
                    event = inbound.recv() => event,
                };
                match event {
                    Some(event) => dispatcher_inner.route(event),
                    None => break,
                }
            }
            dispatcher_inner.fail_all();
        });
        inner.track(dispatcher);

        Self { inner }
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Questions forwarded and not yet answered
    pub fn pending_requests(&self) -> usize {
        self.inner.lock_pending().len()
    }

    /// Forward one question and wait for its correlated answer
    pub async fn ask(&self, message: &str) -> Result<ChatAnswer, ChatFailure> {
        if message.trim().is_empty() {
            return Err(ChatFailure::EmptyMessage);
        }

        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.inner.lock_pending();
            // Checked under the lock so fail_all cannot miss this entry
            if !self.inner.open.load(Ordering::SeqCst) {
                return Err(ChatFailure::Unavailable);
            }
            pending.insert(request_id, tx);
        }
        let _guard = PendingGuard {
            inner: self.inner.as_ref(),
            request_id,
        };

        self.inner
            .outbound
            .send(ChatUpstreamEvent::ChatMessage {
                request_id,
                message: message.to_string(),
            })
            .await
            .map_err(|_| ChatFailure::Unavailable)?;
        debug!(%request_id, "Forwarded chat message");

        rx.await.unwrap_or(Err(ChatFailure::Disconnected))
    }

    /// Close the connection and wait for the link's tasks to finish
    pub async fn close(&self) {
        self.inner.shutdown.cancel();
        let handles: Vec<_> = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
        self.inner.fail_all();
        info!("Chat link closed");
    }
}
