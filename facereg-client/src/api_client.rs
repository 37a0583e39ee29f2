//! HTTP client for the facereg API server

use async_trait::async_trait;
use facereg_common::api::{
    AllUsersResponse, ErrorBody, ImageRequest, RegisterRequest, RegistrationResponse,
};
use facereg_common::{EncodingRecord, RecognizedFace};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::capture::FrameSink;
use crate::error::{ClientError, Result};

const USER_AGENT: &str = concat!("facereg-client/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `ws://` / `wss://` URL of the push channel on the same server
    pub fn push_url(&self) -> String {
        let rest = self
            .base_url
            .strip_prefix("https://")
            .map(|rest| format!("wss://{}", rest))
            .or_else(|| {
                self.base_url
                    .strip_prefix("http://")
                    .map(|rest| format!("ws://{}", rest))
            })
            .unwrap_or_else(|| self.base_url.clone());
        format!("{}/ws", rest)
    }

    pub async fn register(&self, name: &str, image: &str) -> Result<RegistrationResponse> {
        let request = RegisterRequest {
            name: Some(name.to_string()),
            image: Some(image.to_string()),
        };
        let response = self
            .http_client
            .post(format!("{}/api/face/register", self.base_url))
            .json(&request)
            .send()
            .await?;
        parse_json(response).await
    }

    /// Recognize faces in one frame
    pub async fn recognize(&self, image: &str) -> Result<Vec<RecognizedFace>> {
        let request = ImageRequest {
            image: Some(image.to_string()),
        };
        let response = self
            .http_client
            .post(format!("{}/api/recognition/recognize", self.base_url))
            .json(&request)
            .send()
            .await?;
        let payload: Value = parse_json(response).await?;
        RecognizedFace::parse_all(&payload).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn registrations(&self) -> Result<Vec<EncodingRecord>> {
        let response = self
            .http_client
            .get(format!("{}/api/face/registered", self.base_url))
            .send()
            .await?;
        parse_json(response).await
    }

    pub async fn all_users(&self) -> Result<AllUsersResponse> {
        let response = self
            .http_client
            .get(format!("{}/api/face/allUsers", self.base_url))
            .send()
            .await?;
        parse_json(response).await
    }
}

#[async_trait]
impl FrameSink for ApiClient {
    async fn submit(&self, frame: String) -> Result<Vec<RecognizedFace>> {
        self.recognize(&frame).await
    }
}

/// Decode a success body, or surface the server's `{"error"}` message
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    debug!(status = status.as_u16(), bytes = body.len(), "API response");

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        return Err(ClientError::Server {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}
