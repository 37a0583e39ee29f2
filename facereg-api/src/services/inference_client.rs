//! Inference service HTTP client
//!
//! Thin wrapper over the external face service's two endpoints:
//! - `POST /encode {image}` → `{success, encoding}` or `{error}`
//! - `POST /recognize {image}` → JSON array of recognized faces
//!
//! No retries. A timeout is applied only when configured.

use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("facereg-api/", env!("CARGO_PKG_VERSION"));

/// Message used when the encode endpoint answers without an encoding or a reason
pub const NO_FACE_MESSAGE: &str = "No face detected in the image";

/// Inference client errors
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Service answered with a structured failure (`{error}` or no encoding)
    #[error("{0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    encoding: Option<Vec<f64>>,
    #[serde(default)]
    error: Option<String>,
}

/// Handle to the inference service; cheap to clone
#[derive(Clone, Debug)]
pub struct InferenceClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Obtain the face encoding for a single-face image
    pub async fn encode(&self, image: &str) -> Result<Vec<f64>, UpstreamError> {
        let response = self
            .http_client
            .post(format!("{}/encode", self.base_url))
            .json(&json!({ "image": image }))
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        // A structured body wins over the status code: the service answers
        // "no face" and "multiple faces" with 400 plus an error message.
        if let Ok(parsed) = serde_json::from_str::<EncodeResponse>(&body) {
            if let Some(message) = parsed.error {
                return Err(UpstreamError::Rejected(message));
            }
            if status.is_success() {
                return match parsed.encoding {
                    Some(encoding) if !encoding.is_empty() && parsed.success != Some(false) => {
                        tracing::debug!(dimensions = encoding.len(), "Encode succeeded");
                        Ok(encoding)
                    }
                    _ => Err(UpstreamError::Rejected(NO_FACE_MESSAGE.to_string())),
                };
            }
        }

        if status.is_success() {
            Err(UpstreamError::Parse(format!("unexpected encode body: {}", body)))
        } else {
            Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Recognize faces in one frame; the body is returned untouched
    pub async fn recognize(&self, image: &str) -> Result<Value, UpstreamError> {
        let response = self
            .http_client
            .post(format!("{}/recognize", self.base_url))
            .json(&json!({ "image": image }))
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> InferenceClient {
        InferenceClient::new(server.base_url(), None).unwrap()
    }

    #[tokio::test]
    async fn test_encode_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/encode")
                    .json_body(json!({"image": "data:image/jpeg;base64,AAAA"}));
                then.status(200)
                    .json_body(json!({"success": true, "encoding": [0.1, 0.2, 0.3]}));
            })
            .await;

        let encoding = client_for(&server)
            .encode("data:image/jpeg;base64,AAAA")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(encoding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_encode_structured_400_is_rejected_with_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/encode");
                then.status(400).json_body(json!({
                    "error": "Multiple faces detected. Please ensure only one face is in the frame"
                }));
            })
            .await;

        let err = client_for(&server).encode("img").await.unwrap_err();
        match err {
            UpstreamError::Rejected(msg) => assert!(msg.starts_with("Multiple faces")),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_encode_success_without_encoding_means_no_face() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/encode");
                then.status(200).json_body(json!({"success": false}));
            })
            .await;

        let err = client_for(&server).encode("img").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Rejected(ref m) if m == NO_FACE_MESSAGE));
    }

    #[tokio::test]
    async fn test_encode_unstructured_500_is_status_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/encode");
                then.status(500).body("Internal Server Error");
            })
            .await;

        let err = client_for(&server).encode("img").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_recognize_returns_body_verbatim() {
        let server = MockServer::start_async().await;
        let faces = json!([
            {"name": "Alice", "box": {"top": 1, "right": 2, "bottom": 3, "left": 0}, "extra": true}
        ]);
        let body = faces.clone();
        server
            .mock_async(move |when, then| {
                when.method(POST).path("/recognize");
                then.status(200).json_body(body);
            })
            .await;

        let result = client_for(&server).recognize("img").await.unwrap();
        assert_eq!(result, faces);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let client = InferenceClient::new("http://127.0.0.1:9", None).unwrap();
        let err = client.recognize("img").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Network(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = InferenceClient::new("http://localhost:5001/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5001");
    }
}
