use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,                // logical name, e.g. "yolo11s"
    pub onnx_path: String,           // filesystem path
    pub labels_path: Option<String>, // one label per line; COCO-80 when absent
}

impl ModelId {
    pub fn from_path(onnx_path: &str, labels_path: Option<String>) -> Self {
        let name = std::path::Path::new(onnx_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| onnx_path.to_string());
        Self { name, onnx_path: onnx_path.to_string(), labels_path }
    }
}

/// Parameters handed to the detector on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub conf_threshold: f32,    // 0..1
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,  // e.g. 300
    pub agnostic_nms: bool,
    pub device: String,         // "cpu", "cuda", "cuda:1"
    pub half: bool,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.01,
            iou_threshold: 0.45,
            max_detections: 300,
            agnostic_nms: false,
            device: "cpu".to_string(),
            half: false,
        }
    }
}

impl YoloParams {
    /// CUDA device index selected by `device`, `None` for CPU.
    pub fn cuda_device(&self) -> Option<i32> {
        let device = self.device.trim().to_ascii_lowercase();
        match device.as_str() {
            "cuda" | "gpu" => Some(0),
            d => d.strip_prefix("cuda:").and_then(|idx| idx.parse().ok()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub model: ModelId,
    pub params: YoloParams,
}
