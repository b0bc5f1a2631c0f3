use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis-aligned box `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl From<[f32; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl BBox {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union, 0 when the boxes do not overlap.
    pub fn iou(&self, other: &BBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        if x2 < x1 || y2 < y1 {
            return 0.0;
        }
        let inter = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - inter;
        if union > 0.0 { inter / union } else { 0.0 }
    }
}

/// What the detector reports for one object, labels already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: usize,
    pub class_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: usize,
    pub class_name: String,
}

impl Detection {
    pub fn from_raw(raw: RawDetection, id: Option<String>) -> Self {
        Self {
            id,
            bbox: raw.bbox,
            confidence: raw.confidence,
            class_id: raw.class_id,
            class_name: raw.class_name,
        }
    }
}

/// How many of the model's detections end up in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReducePolicy {
    #[default]
    Passthrough,
    Top1,
}

/// Greedy NMS. Keeps the highest-confidence box and drops anything overlapping it by
/// `iou_threshold` or more; unless `agnostic`, only boxes of the same class compete.
pub fn non_max_suppression(
    mut detections: Vec<RawDetection>,
    iou_threshold: f32,
    agnostic: bool,
) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::with_capacity(detections.len());
    for det in detections {
        let suppressed = keep.iter().any(|k| {
            (agnostic || k.class_id == det.class_id) && k.bbox.iou(&det.bbox) >= iou_threshold
        });
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub total_count: usize,
    pub class_counts: BTreeMap<String, usize>,
    pub average_confidence: f32,
}

impl DetectionStats {
    pub fn from_detections(detections: &[Detection]) -> Self {
        if detections.is_empty() {
            return Self::default();
        }
        let mut class_counts = BTreeMap::new();
        let mut total_confidence = 0.0;
        for det in detections {
            *class_counts.entry(det.class_name.clone()).or_insert(0) += 1;
            total_confidence += det.confidence;
        }
        Self {
            total_count: detections.len(),
            class_counts,
            average_confidence: total_confidence / detections.len() as f32,
        }
    }
}

pub fn summarize_detections(detections: &[Detection]) -> String {
    DetectionStats::from_detections(detections)
        .class_counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}
