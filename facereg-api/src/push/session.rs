//! Per-connection push session
//!
//! Turns inbound [`ClientEvent`]s into outbound [`ServerEvent`]s:
//! - `frame` → frame gate → recognition worker → `recognition_result` / `recognition_error`
//! - `register` → registration relay → `registration_result`
//! - `chat_message` → chat relay → `chat_response` / `chat_error`
//!
//! Failures become sibling error events; the connection always survives.
//! Dropping the session cancels its worker and any unfinished chat waits.
//! A registration already relayed runs to completion and is stored; only its
//! reply is lost.

use facereg_common::api::{ImageRequest, RegisterRequest};
use facereg_common::events::{ChatRequest, ClientEvent, RegistrationOutcome, ServerEvent};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::push::frame_gate::FrameGate;
use crate::services::{chat, recognition, registration, InferenceClient};
use crate::AppState;

pub struct PushSession {
    state: AppState,
    outbound: mpsc::Sender<ServerEvent>,
    gate: Arc<FrameGate<ImageRequest>>,
    shutdown: CancellationToken,
}

impl PushSession {
    /// Start a session; its recognition worker runs until the session drops
    pub fn start(state: AppState, outbound: mpsc::Sender<ServerEvent>) -> Self {
        let gate = Arc::new(FrameGate::new());
        let shutdown = CancellationToken::new();

        tokio::spawn(run_recognition_worker(
            Arc::clone(&gate),
            state.inference.clone(),
            outbound.clone(),
            shutdown.clone(),
        ));

        Self {
            state,
            outbound,
            gate,
            shutdown,
        }
    }

    /// Dispatch one inbound event without waiting for its result
    pub fn handle(&self, event: ClientEvent) {
        debug!(event = event.event_name(), "Push event received");
        match event {
            ClientEvent::Frame(frame) => {
                if self.gate.offer(frame) {
                    debug!("Frame replaced an unprocessed frame");
                }
            }
            ClientEvent::Register(request) => {
                let state = self.state.clone();
                let outbound = self.outbound.clone();
                tokio::spawn(async move {
                    let event = register(state, request).await;
                    deliver(&outbound, event).await;
                });
            }
            ClientEvent::ChatMessage(request) => {
                let state = self.state.clone();
                self.spawn_reply(async move { ask(state, request).await });
            }
        }
    }

    /// Frames dropped by coalescing so far
    pub fn coalesced_frames(&self) -> u64 {
        self.gate.coalesced()
    }

    fn spawn_reply<F>(&self, work: F)
    where
        F: Future<Output = ServerEvent> + Send + 'static,
    {
        let outbound = self.outbound.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                event = work => deliver(&outbound, event).await,
            }
        });
    }
}

async fn deliver(outbound: &mpsc::Sender<ServerEvent>, event: ServerEvent) {
    if outbound.send(event).await.is_err() {
        debug!("Client left before reply was sent");
    }
}

impl Drop for PushSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_recognition_worker(
    gate: Arc<FrameGate<ImageRequest>>,
    inference: InferenceClient,
    outbound: mpsc::Sender<ServerEvent>,
    shutdown: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = gate.next() => frame,
        };

        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = recognition::recognize(&inference, frame) => match result {
                Ok(faces) => ServerEvent::RecognitionResult(faces),
                Err(e) => {
                    e.log("frame");
                    ServerEvent::recognition_error(
                        e.public_message(recognition::FRAME_FAILED_MESSAGE),
                    )
                }
            },
        };

        if outbound.send(event).await.is_err() {
            break;
        }
    }
}

async fn register(state: AppState, request: RegisterRequest) -> ServerEvent {
    let outcome = match registration::register_face(&state.db, &state.inference, request).await {
        Ok(_) => RegistrationOutcome::Registered {
            message: registration::REGISTERED_MESSAGE.to_string(),
        },
        Err(e) => {
            e.log("register");
            RegistrationOutcome::Failed {
                error: e.public_message(registration::REGISTER_FAILED_MESSAGE),
            }
        }
    };
    ServerEvent::RegistrationResult(outcome)
}

async fn ask(state: AppState, request: ChatRequest) -> ServerEvent {
    match chat::relay_chat(state.chat.as_ref(), request).await {
        Ok(answer) => ServerEvent::ChatResponse(answer),
        Err(e) => {
            warn!(error = %e, "Chat relay failed");
            ServerEvent::chat_error(e.public_message())
        }
    }
}
