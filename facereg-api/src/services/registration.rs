//! Registration relay
//!
//! Validate → encode via the inference service → persist one record.
//! Shared by `POST /api/face/register` and the push-channel `register` event.

use facereg_common::api::RegisterRequest;
use facereg_common::EncodingRecord;
use sqlx::SqlitePool;
use tracing::info;

use crate::db;
use crate::error::RelayError;
use crate::services::inference_client::InferenceClient;

pub const REGISTERED_MESSAGE: &str = "Face registered successfully";
pub const MISSING_FIELDS_MESSAGE: &str = "Name and image are required";
pub const REGISTER_FAILED_MESSAGE: &str = "Failed to register face";

/// Both fields present, name trimmed and non-empty
fn validate(request: RegisterRequest) -> Result<(String, String), RelayError> {
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    let image = request.image.filter(|image| !image.is_empty());

    match (name, image) {
        (Some(name), Some(image)) => Ok((name, image)),
        _ => Err(RelayError::Validation(MISSING_FIELDS_MESSAGE.to_string())),
    }
}

/// Register one face; exactly one durable write on success, none on failure
pub async fn register_face(
    pool: &SqlitePool,
    inference: &InferenceClient,
    request: RegisterRequest,
) -> Result<EncodingRecord, RelayError> {
    let (name, image) = validate(request)?;

    let encoding = inference.encode(&image).await?;
    let record = db::registrations::insert(pool, &name, &encoding).await?;

    info!(
        id = record.id,
        name = %record.name,
        dimensions = record.encoding.len(),
        "Face registered"
    );

    Ok(record)
}
