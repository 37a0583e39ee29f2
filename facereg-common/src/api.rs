//! HTTP request/response bodies shared by the API server and its clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/face/register`
///
/// Fields are optional so that a missing field reaches validation
/// instead of failing JSON extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Body of `POST /api/recognition/recognize` and of push `frame` events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub image: Option<String>,
}

/// What a successful registration echoes back (the encoding is not returned)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    pub name: String,
    pub registered_at: DateTime<Utc>,
}

/// `201` body of `POST /api/face/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub success: bool,
    pub message: String,
    pub registration: RegistrationSummary,
}

/// One entry of the bulk export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEncoding {
    pub name: String,
    pub encoding: Vec<f64>,
}

/// Body of `GET /api/face/allUsers`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllUsersResponse {
    pub success: bool,
    pub count: usize,
    pub users: Vec<UserEncoding>,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
