//! Error types for facereg-client

use thiserror::Error;

/// Failure talking to the API server
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an error status and `{"error": ...}` body
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Push channel error: {0}")]
    Push(String),

    /// Push channel closed while a reply was outstanding
    #[error("Push channel closed")]
    Closed,

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Text fit to show inline next to the control that caused it
    pub fn display_message(&self) -> String {
        match self {
            ClientError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Failure starting or running a capture session
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Access to the capture device was refused
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Frame capture failed: {0}")]
    Frame(String),

    #[error("Capture already running")]
    AlreadyStreaming,
}

pub type Result<T> = std::result::Result<T, ClientError>;
