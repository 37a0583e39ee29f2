//! # facereg Common Library
//!
//! Shared code for the facereg API server and capture client:
//! - HTTP request/response bodies
//! - Encoding record and recognized-face models
//! - Real-time channel event vocabulary
//! - Configuration loading
//! - Common error type

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use models::{BoundingBox, ChatAnswer, EncodingRecord, RecognizedFace, UNKNOWN_NAME};
