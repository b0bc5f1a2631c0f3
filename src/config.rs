use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::application::{dto::ConfigResponse, services::FrameSettings};
use crate::domain::{
    detection::ReducePolicy,
    model::{InferenceConfig, ModelId, YoloParams},
};

/// Bundled confidence / IoU / max-detections triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    HighAccuracy,
    Balanced,
    HighRecall,
    VeryHighAccuracy,
    /// Use --conf, --iou and --max-det as given.
    Custom,
}

impl Preset {
    pub fn thresholds(self) -> Option<(f32, f32, usize)> {
        match self {
            Preset::HighAccuracy => Some((0.5, 0.45, 100)),
            Preset::Balanced => Some((0.6, 0.5, 200)),
            Preset::HighRecall => Some((0.4, 0.5, 300)),
            Preset::VeryHighAccuracy => Some((0.8, 0.4, 50)),
            Preset::Custom => None,
        }
    }
}

/// Detection relay server configuration. Every flag can also be set through the
/// matching `RELAY_*` environment variable.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Bind address
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port
    #[arg(long, env = "RELAY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Permitted origins: "*" or a comma separated list
    #[arg(long, env = "RELAY_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// ONNX model file
    #[arg(long, env = "RELAY_MODEL", default_value = "model/yolo11s.onnx", value_name = "FILE")]
    pub model: String,

    /// Label table, one class name per line (COCO-80 when omitted)
    #[arg(long, env = "RELAY_LABELS", value_name = "FILE")]
    pub labels: Option<String>,

    /// Confidence floor (0.0 - 1.0)
    #[arg(long, env = "RELAY_CONF", default_value_t = 0.01, value_name = "THRESHOLD")]
    pub conf: f32,

    /// NMS IoU floor (0.0 - 1.0)
    #[arg(long, env = "RELAY_IOU", default_value_t = 0.45, value_name = "THRESHOLD")]
    pub iou: f32,

    /// Inference input size
    #[arg(long, env = "RELAY_IMGSZ", default_value_t = 640)]
    pub imgsz: u32,

    /// cpu, cuda or cuda:N
    #[arg(long, env = "RELAY_DEVICE", default_value = "cpu")]
    pub device: String,

    /// FP16 inference (GPU only)
    #[arg(long, env = "RELAY_HALF", default_value_t = false)]
    pub half: bool,

    /// Maximum detections per frame
    #[arg(long, env = "RELAY_MAX_DET", default_value_t = 300)]
    pub max_det: usize,

    /// Class-agnostic NMS
    #[arg(long, env = "RELAY_AGNOSTIC_NMS", default_value_t = false)]
    pub agnostic_nms: bool,

    /// Threshold preset; overrides --conf/--iou/--max-det unless "custom"
    #[arg(long, env = "RELAY_PRESET", value_enum, default_value_t = Preset::HighRecall)]
    pub preset: Preset,

    /// Frames are shrunk so their longer side fits this budget
    #[arg(long, env = "RELAY_FRAME_MAX_DIM", default_value_t = 640, value_parser = clap::value_parser!(u32).range(1..))]
    pub frame_max_dim: u32,

    /// Which detections are sent back
    #[arg(long, env = "RELAY_POLICY", value_enum, default_value_t = ReducePolicy::Passthrough)]
    pub policy: ReducePolicy,

    #[arg(long, env = "RELAY_INFERENCE_TIMEOUT_MS", default_value_t = 10_000)]
    pub inference_timeout_ms: u64,

    /// Identities unseen for longer than this are forgotten
    #[arg(long, env = "RELAY_TRACK_MAX_AGE_SECS", default_value_t = 5)]
    pub track_max_age_secs: u64,

    #[arg(long, env = "RELAY_SWEEP_INTERVAL_MS", default_value_t = 1_000)]
    pub sweep_interval_ms: u64,
}

impl Config {
    pub fn yolo_params(&self) -> YoloParams {
        let (conf, iou, max_det) = self.preset.thresholds().unwrap_or((self.conf, self.iou, self.max_det));
        YoloParams {
            input_size: self.imgsz,
            conf_threshold: conf,
            iou_threshold: iou,
            max_detections: max_det,
            agnostic_nms: self.agnostic_nms,
            device: self.device.clone(),
            half: self.half,
        }
    }

    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model: ModelId::from_path(&self.model, self.labels.clone()),
            params: self.yolo_params(),
        }
    }

    pub fn frame_settings(&self) -> FrameSettings {
        FrameSettings { params: self.yolo_params(), max_dim: self.frame_max_dim, policy: self.policy }
    }

    /// `None` means any origin.
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }

    pub fn track_max_age(&self) -> Duration {
        Duration::from_secs(self.track_max_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    pub fn describe(&self) -> ConfigResponse {
        ConfigResponse {
            model_path: self.model.clone(),
            preset: format!("{:?}", self.preset),
            yolo: self.yolo_params(),
            frame_max_dim: self.frame_max_dim,
            policy: self.policy,
            inference_timeout_ms: self.inference_timeout_ms,
            track_max_age_secs: self.track_max_age_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("detection-relay").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_use_high_recall_preset() {
        let cfg = parse(&[]);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
        let p = cfg.yolo_params();
        assert_eq!((p.conf_threshold, p.iou_threshold, p.max_detections), (0.4, 0.5, 300));
        assert_eq!(p.input_size, 640);
        assert_eq!(cfg.policy, ReducePolicy::Passthrough);
        assert!(cfg.allowed_origins().is_none());
    }

    #[test]
    fn custom_preset_keeps_flags() {
        let cfg = parse(&["--preset", "custom", "--conf", "0.3", "--iou", "0.6", "--max-det", "7"]);
        let p = cfg.yolo_params();
        assert_eq!((p.conf_threshold, p.iou_threshold, p.max_detections), (0.3, 0.6, 7));

        let cfg = parse(&["--preset", "very-high-accuracy", "--conf", "0.3"]);
        assert_eq!(cfg.yolo_params().conf_threshold, 0.8);
    }

    #[test]
    fn origins_and_policy() {
        let cfg = parse(&["--cors-origins", "http://a.test/, http://b.test", "--policy", "top1"]);
        assert_eq!(
            cfg.allowed_origins(),
            Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
        assert_eq!(cfg.policy, ReducePolicy::Top1);
    }

    #[test]
    fn zero_frame_budget_is_rejected() {
        let args = ["detection-relay", "--frame-max-dim", "0"];
        assert!(Config::try_parse_from(args).is_err());
        assert_eq!(parse(&["--frame-max-dim", "1"]).frame_max_dim, 1);
    }
}
