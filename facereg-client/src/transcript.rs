//! Chat transcript kept by the client

use facereg_common::ChatAnswer;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Response,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// Chat history in display order
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(ChatRole::User, text.into(), Vec::new());
    }

    pub fn push_answer(&mut self, answer: ChatAnswer) {
        self.push(ChatRole::Response, answer.answer, answer.sources);
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.push(ChatRole::Error, message.into(), Vec::new());
    }

    fn push(&mut self, role: ChatRole, text: String, sources: Vec<String>) {
        self.messages.push(ChatMessage {
            role,
            text,
            sources,
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
