//! Push channel client (`/ws`)
//!
//! Recognition replies and chat replies arrive on separate queues, so a
//! pending frame never consumes a chat answer and vice versa. At most one
//! frame is outstanding on the server: if a caller gave up on a frame, the
//! next `recognize` waits out and discards that frame's reply before sending,
//! so replies never shift onto later frames. [`CaptureSession`] keeps the
//! same one-at-a-time discipline on its side.
//!
//! [`CaptureSession`]: crate::capture::CaptureSession

use async_trait::async_trait;
use facereg_common::api::{ImageRequest, RegisterRequest};
use facereg_common::events::{ChatRequest, ClientEvent, RegistrationOutcome, ServerEvent};
use facereg_common::{ChatAnswer, RecognizedFace};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::capture::FrameSink;
use crate::error::{ClientError, Result};

const QUEUE_CAPACITY: usize = 16;

/// Reply to a `chat_message`: the answer, or the server's error text
pub type ChatReply = std::result::Result<ChatAnswer, String>;

/// Recognition replies plus the number of sent frames nobody has read a reply for
struct Recognitions {
    replies: mpsc::Receiver<ServerEvent>,
    unanswered: usize,
}

pub struct PushClient {
    outbound: mpsc::Sender<ClientEvent>,
    recognitions: Mutex<Recognitions>,
    registrations: Mutex<mpsc::Receiver<RegistrationOutcome>>,
    chats: Mutex<mpsc::Receiver<ChatReply>>,
    tasks: Vec<JoinHandle<()>>,
}

impl PushClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::Push(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();
        debug!(url, "Push channel connected");

        let (outbound, mut outbound_rx) = mpsc::channel::<ClientEvent>(QUEUE_CAPACITY);
        let (recognition_tx, recognitions) = mpsc::channel(QUEUE_CAPACITY);
        let (registration_tx, registrations) = mpsc::channel(QUEUE_CAPACITY);
        let (chat_tx, chats) = mpsc::channel(QUEUE_CAPACITY);

        let writer = tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
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
            let _ = sink.send(Message::Close(None)).await;
        });

        let reader = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                let event = match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Ignoring malformed push event: {}", e);
                        continue;
                    }
                };
                let delivered = match event {
                    ServerEvent::RecognitionResult(_) | ServerEvent::RecognitionError(_) => {
                        recognition_tx.send(event).await.is_ok()
                    }
                    ServerEvent::RegistrationResult(outcome) => {
                        registration_tx.send(outcome).await.is_ok()
                    }
                    ServerEvent::ChatResponse(answer) => chat_tx.send(Ok(answer)).await.is_ok(),
                    ServerEvent::ChatError(body) => chat_tx.send(Err(body.message)).await.is_ok(),
                };
                if !delivered {
                    break;
                }
            }
            debug!("Push channel reader exited");
        });

        Ok(Self {
            outbound,
            recognitions: Mutex::new(Recognitions {
                replies: recognitions,
                unanswered: 0,
            }),
            registrations: Mutex::new(registrations),
            chats: Mutex::new(chats),
            tasks: vec![writer, reader],
        })
    }

    async fn send(&self, event: ClientEvent) -> Result<()> {
        self.outbound.send(event).await.map_err(|_| ClientError::Closed)
    }

    /// Send one frame and wait for its recognition outcome
    ///
    /// Cancel safe: a reply that arrives after the caller stopped waiting is
    /// consumed by the next call instead of being mistaken for its own.
    pub async fn recognize(&self, image: String) -> Result<Vec<RecognizedFace>> {
        let mut queue = self.recognitions.lock().await;
        while queue.unanswered > 0 {
            queue.replies.recv().await.ok_or(ClientError::Closed)?;
            queue.unanswered -= 1;
            debug!("Discarded reply to an abandoned frame");
        }

        self.send(ClientEvent::Frame(ImageRequest { image: Some(image) }))
            .await?;
        queue.unanswered += 1;

        let reply = queue.replies.recv().await.ok_or(ClientError::Closed)?;
        queue.unanswered -= 1;

        match reply {
            ServerEvent::RecognitionResult(payload) => RecognizedFace::parse_all(&payload)
                .map_err(|e| ClientError::Decode(e.to_string())),
            ServerEvent::RecognitionError(body) => Err(ClientError::Push(body.error)),
            other => Err(ClientError::Decode(format!(
                "unexpected {} event",
                other.event_name()
            ))),
        }
    }

    pub async fn register(&self, name: &str, image: String) -> Result<RegistrationOutcome> {
        let mut replies = self.registrations.lock().await;
        self.send(ClientEvent::Register(RegisterRequest {
            name: Some(name.to_string()),
            image: Some(image),
        }))
        .await?;
        replies.recv().await.ok_or(ClientError::Closed)
    }

    /// Ask the chat service a question through the server
    pub async fn ask(&self, message: &str) -> Result<ChatReply> {
        let mut replies = self.chats.lock().await;
        self.send(ClientEvent::ChatMessage(ChatRequest {
            message: Some(message.to_string()),
        }))
        .await?;
        replies.recv().await.ok_or(ClientError::Closed)
    }
}

impl Drop for PushClient {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl FrameSink for PushClient {
    async fn submit(&self, frame: String) -> Result<Vec<RecognizedFace>> {
        self.recognize(frame).await
    }
}
