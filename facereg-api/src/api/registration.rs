//! Face registration endpoints
//!
//! - `POST /api/face/register`: encode and persist one face
//! - `GET /api/face/registered`: every record, newest first
//! - `GET /api/face/allUsers`: name + encoding export for bulk consumers

use axum::{extract::State, http::StatusCode, Json};
use facereg_common::api::{
    AllUsersResponse, RegisterRequest, RegistrationResponse, RegistrationSummary,
};
use facereg_common::EncodingRecord;
use tracing::error;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::services::registration::{self as relay, REGISTERED_MESSAGE, REGISTER_FAILED_MESSAGE};
use crate::AppState;

const LIST_FAILED_MESSAGE: &str = "Failed to fetch registrations";
const EXPORT_FAILED_MESSAGE: &str = "Failed to fetch users";

/// An absent or unparseable body is treated as one with no fields, so it
/// fails validation with the usual message rather than an extractor error
fn request_or_default(body: Option<Json<RegisterRequest>>) -> RegisterRequest {
    body.map(|Json(request)| request).unwrap_or_default()
}

/// POST /api/face/register
pub async fn register_face(
    State(state): State<AppState>,
    body: Option<Json<RegisterRequest>>,
) -> ApiResult<(StatusCode, Json<RegistrationResponse>)> {
    let record = relay::register_face(&state.db, &state.inference, request_or_default(body))
        .await
        .map_err(|e| ApiError::from_relay(e, "register", REGISTER_FAILED_MESSAGE))?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            success: true,
            message: REGISTERED_MESSAGE.to_string(),
            registration: RegistrationSummary {
                name: record.name,
                registered_at: record.registered_at,
            },
        }),
    ))
}

/// GET /api/face/registered
pub async fn list_registrations(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EncodingRecord>>> {
    let records = db::registrations::list_newest_first(&state.db)
        .await
        .map_err(|e| {
            error!("Failed to list registrations: {}", e);
            ApiError::Internal(LIST_FAILED_MESSAGE.to_string())
        })?;

    Ok(Json(records))
}

/// GET /api/face/allUsers
pub async fn all_users(State(state): State<AppState>) -> ApiResult<Json<AllUsersResponse>> {
    let users = db::registrations::export_all(&state.db).await.map_err(|e| {
        error!("Failed to export users: {}", e);
        ApiError::Internal(EXPORT_FAILED_MESSAGE.to_string())
    })?;

    Ok(Json(AllUsersResponse {
        success: true,
        count: users.len(),
        users,
    }))
}
