//! Recognition endpoint

use axum::{extract::State, Json};
use facereg_common::api::ImageRequest;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::services::recognition::{self as relay, RECOGNIZE_FAILED_MESSAGE};
use crate::AppState;

/// POST /api/recognition/recognize
///
/// Returns the inference service's body as-is.
pub async fn recognize_faces(
    State(state): State<AppState>,
    body: Option<Json<ImageRequest>>,
) -> ApiResult<Json<Value>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let faces = relay::recognize(&state.inference, request)
        .await
        .map_err(|e| ApiError::from_relay(e, "recognize", RECOGNIZE_FAILED_MESSAGE))?;

    Ok(Json(faces))
}
