use serde::{Deserialize, Serialize};

use super::detection::Detection;
use super::frame::{FramePayload, FrameSize, Transform};

/// Messages a client may send. On the wire: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Frame(FramePayload),
    Ping(PingPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    ConnectionResponse { status: String, message: String },
    Detections(DetectionsResponse),
    Error { message: String },
    Pong(PingPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingPayload {
    #[serde(default)]
    pub timestamp: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionsResponse {
    pub detections: Vec<Detection>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frame_size: Option<FrameSize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transform: Option<Transform>,
}

impl DetectionsResponse {
    pub fn new(detections: Vec<Detection>, frame_size: FrameSize, transform: Transform) -> Self {
        Self {
            count: detections.len(),
            detections,
            frame_size: Some(frame_size),
            transform: Some(transform),
        }
    }
}
