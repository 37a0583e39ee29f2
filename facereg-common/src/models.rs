//! Data model shared by the API server and the capture client
//!
//! The encoding vector is opaque: only the external inference service knows
//! its length and meaning. Recognized faces are transient and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Name the inference service reports for a face with no registered match
pub const UNKNOWN_NAME: &str = "Unknown";

/// A registered face: a name plus the encoding the inference service produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingRecord {
    /// Store-assigned row id; duplicates of `name` are told apart by it
    pub id: i64,
    /// Trimmed, non-empty display name
    pub name: String,
    /// Opaque feature vector, never mutated after creation
    pub encoding: Vec<f64>,
    /// Creation time (UTC)
    pub registered_at: DateTime<Utc>,
}

/// Axis-aligned face rectangle in frame pixel coordinates
///
/// The inference service has used several box shapes over time. All of them
/// deserialize into this edge form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoxShape")]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoxShape {
    Edges {
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
    },
    Extent {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
    Xywh {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
}

impl From<BoxShape> for BoundingBox {
    fn from(shape: BoxShape) -> Self {
        match shape {
            BoxShape::Edges {
                left,
                top,
                right,
                bottom,
            } => BoundingBox {
                left,
                top,
                right,
                bottom,
            },
            BoxShape::Extent {
                left,
                top,
                width,
                height,
            } => BoundingBox {
                left,
                top,
                right: left + width,
                bottom: top + height,
            },
            BoxShape::Xywh { x, y, w, h } => BoundingBox {
                left: x,
                top: y,
                right: x + w,
                bottom: y + h,
            },
        }
    }
}

/// One face found in a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedFace {
    #[serde(rename = "box", alias = "location", alias = "facial_area")]
    pub bounding_box: BoundingBox,
    /// Matched name, or [`UNKNOWN_NAME`]
    #[serde(default = "unknown_name")]
    pub name: String,
    /// Match confidence, clamped to [0, 1]
    #[serde(default, deserialize_with = "clamped_confidence")]
    pub confidence: f64,
}

impl RecognizedFace {
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_NAME
    }

    /// Parse a raw recognition payload (a JSON array of faces)
    pub fn parse_all(payload: &serde_json::Value) -> crate::Result<Vec<RecognizedFace>> {
        Ok(Vec::<RecognizedFace>::deserialize(payload)?)
    }
}

fn unknown_name() -> String {
    UNKNOWN_NAME.to_string()
}

fn clamped_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if raw.is_nan() {
        return Ok(0.0);
    }
    Ok(raw.clamp(0.0, 1.0))
}

/// Answer produced by the chat collaborator
///
/// Older chat services reply with a bare string; newer ones send an object
/// with optional source citations. Both deserialize into this form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AnswerShape")]
pub struct ChatAnswer {
    pub answer: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl ChatAnswer {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerShape {
    Text(String),
    Full {
        answer: String,
        #[serde(default)]
        sources: Vec<String>,
    },
}

impl From<AnswerShape> for ChatAnswer {
    fn from(shape: AnswerShape) -> Self {
        match shape {
            AnswerShape::Text(answer) => ChatAnswer {
                answer,
                sources: Vec::new(),
            },
            AnswerShape::Full { answer, sources } => ChatAnswer { answer, sources },
        }
    }
}
