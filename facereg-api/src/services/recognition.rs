//! Recognition relay
//!
//! Forwards one frame to the inference service and hands back its body
//! untouched. No caching, no deduplication.

use facereg_common::api::ImageRequest;
use serde_json::Value;

use crate::error::RelayError;
use crate::services::inference_client::InferenceClient;

pub const MISSING_IMAGE_MESSAGE: &str = "No image provided";
pub const RECOGNIZE_FAILED_MESSAGE: &str = "Error processing recognition request";
pub const FRAME_FAILED_MESSAGE: &str = "Error processing frame";

pub async fn recognize(
    inference: &InferenceClient,
    request: ImageRequest,
) -> Result<Value, RelayError> {
    let image = request
        .image
        .filter(|image| !image.is_empty())
        .ok_or_else(|| RelayError::Validation(MISSING_IMAGE_MESSAGE.to_string()))?;

    // Every collaborator failure is a transport failure here, even a
    // structured one: recognition errors are never forwarded to the client.
    inference
        .recognize(&image)
        .await
        .map_err(|e| RelayError::Transport(e.to_string()))
}
