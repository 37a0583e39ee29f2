//! Chat relay
//!
//! Bridges a client's `chat_message` to the chat collaborator through the
//! shared [`ChatLink`](crate::services::chat_link::ChatLink).

use facereg_common::events::ChatRequest;
use facereg_common::ChatAnswer;

use crate::services::chat_link::{ChatFailure, ChatLink};

pub async fn relay_chat(
    link: Option<&ChatLink>,
    request: ChatRequest,
) -> Result<ChatAnswer, ChatFailure> {
    let message = request.message.unwrap_or_default();
    if message.trim().is_empty() {
        return Err(ChatFailure::EmptyMessage);
    }

    match link {
        Some(link) => link.ask(&message).await,
        None => Err(ChatFailure::Unavailable),
    }
}
