use serde::{Deserialize, Serialize};

use crate::application::services::FrameCounters;
use crate::domain::{detection::ReducePolicy, model::YoloParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model: Option<String>,
    pub connections: usize,
    pub tracked_identities: usize,
}

/// Configuración efectiva tal como la ve el pipeline de frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub model_path: String,
    pub preset: String,
    pub yolo: YoloParams,
    pub frame_max_dim: u32,
    pub policy: ReducePolicy,
    pub inference_timeout_ms: u64,
    pub track_max_age_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: FrameCounters,
    pub tracked_identities: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
