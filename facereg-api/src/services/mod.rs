//! Relays and collaborator clients
//!
//! Relay logic is transport-neutral: HTTP handlers and the push channel both
//! call into these modules.

pub mod chat;
pub mod chat_link;
pub mod inference_client;
pub mod recognition;
pub mod registration;

pub use chat_link::{ChatFailure, ChatLink};
pub use inference_client::{InferenceClient, UpstreamError};
