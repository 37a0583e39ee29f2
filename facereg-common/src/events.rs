//! Real-time channel event vocabulary
//!
//! Every WebSocket text frame carries one JSON envelope of the form
//! `{"event": "<name>", "data": <payload>}`. The same envelope shape is used
//! between the client and the API server and between the API server and the
//! chat collaborator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{ErrorBody, ImageRequest, RegisterRequest};
use crate::models::ChatAnswer;

/// Events a client sends to the API server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// One sampled video frame to recognize
    Frame(ImageRequest),
    /// Register a face under a name
    Register(RegisterRequest),
    /// Ask the chat collaborator a question
    ChatMessage(ChatRequest),
}

impl ClientEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEvent::Frame(_) => "frame",
            ClientEvent::Register(_) => "register",
            ClientEvent::ChatMessage(_) => "chat_message",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Events the API server pushes to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Raw recognition payload, exactly as the inference service returned it
    #[serde(alias = "recognitionResult")]
    RecognitionResult(serde_json::Value),
    RecognitionError(ErrorBody),
    RegistrationResult(RegistrationOutcome),
    ChatResponse(ChatAnswer),
    ChatError(ChatErrorBody),
}

impl ServerEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::RecognitionResult(_) => "recognition_result",
            ServerEvent::RecognitionError(_) => "recognition_error",
            ServerEvent::RegistrationResult(_) => "registration_result",
            ServerEvent::ChatResponse(_) => "chat_response",
            ServerEvent::ChatError(_) => "chat_error",
        }
    }

    pub fn recognition_error(error: impl Into<String>) -> Self {
        ServerEvent::RecognitionError(ErrorBody {
            error: error.into(),
        })
    }

    pub fn chat_error(message: impl Into<String>) -> Self {
        ServerEvent::ChatError(ChatErrorBody {
            message: message.into(),
        })
    }
}

/// Payload of `registration_result`: `{message}` on success, `{error}` otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistrationOutcome {
    Registered { message: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatErrorBody {
    pub message: String,
}

/// Events exchanged with the chat collaborator
///
/// `request_id` correlates each answer with the question that caused it.
/// Inbound events may omit it; those cannot be routed and are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChatUpstreamEvent {
    ChatMessage {
        request_id: Uuid,
        message: String,
    },
    ChatResponse {
        #[serde(default)]
        request_id: Option<Uuid>,
        answer: String,
        #[serde(default)]
        sources: Vec<String>,
    },
    ChatError {
        #[serde(default)]
        request_id: Option<Uuid>,
        message: String,
    },
}
