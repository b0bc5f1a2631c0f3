use anyhow::{bail, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayView2, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use tracing::{info, warn};

use crate::application::ports::Detector;
use crate::domain::detection::{non_max_suppression, BBox, RawDetection};
use crate::domain::model::YoloParams;

pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

pub struct OnnxYoloEngine {
    name: String,
    session: Session,
    labels: Vec<String>,
}

impl OnnxYoloEngine {
    pub fn load(name: &str, path: &str, labels: Vec<String>, params: &YoloParams) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA solo si se pide; si el proveedor no se registra continuamos en CPU.
        if let Some(device_id) = params.cuda_device() {
            let cuda = CUDAExecutionProvider::default().with_device_id(device_id).build();
            match builder.clone().with_execution_providers([cuda]) {
                Ok(with_cuda) => builder = with_cuda,
                Err(e) => warn!("Dispositivo CUDA {} no disponible, usando CPU: {}", device_id, e),
            }
        }
        if params.half {
            warn!("Media precisión solicitada; solo aplica a grafos exportados en fp16");
        }

        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;
        info!("Sesión ONNX lista: {} ({} etiquetas)", path, labels.len());

        Ok(Self { name: name.to_string(), session, labels })
    }
}

impl Detector for OnnxYoloEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&mut self, rgb: &RgbImage, params: &YoloParams) -> Result<Vec<RawDetection>> {
        let imgsz = params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Nearest);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec()))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 || dims[1] <= 4 {
            bail!("unexpected YOLO output shape {:?}", dims);
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0).into_dimensionality()?;

        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;
        Ok(decode_head(view, sx, sy, &self.labels, params))
    }
}

/// Decodes a `[4 + classes, candidates]` head (cx, cy, w, h, scores...) into boxes in
/// the caller's image space, then applies NMS and the detection cap.
pub fn decode_head(
    view: ArrayView2<f32>,
    sx: f32,
    sy: f32,
    labels: &[String],
    params: &YoloParams,
) -> Vec<RawDetection> {
    let num_candidates = view.shape()[1];
    let mut detections = Vec::new();

    for i in 0..num_candidates {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &max_score)) =
            scores.indexed_iter().max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if max_score > params.conf_threshold {
            let cx = view[[0, i]];
            let cy = view[[1, i]];
            let w = view[[2, i]];
            let h = view[[3, i]];

            detections.push(RawDetection {
                bbox: BBox {
                    x1: (cx - w / 2.0) * sx,
                    y1: (cy - h / 2.0) * sy,
                    x2: (cx + w / 2.0) * sx,
                    y2: (cy + h / 2.0) * sy,
                },
                confidence: max_score,
                class_id,
                class_name: labels.get(class_id).cloned().unwrap_or_else(|| format!("class_{class_id}")),
            });
        }
    }

    let mut kept = non_max_suppression(detections, params.iou_threshold, params.agnostic_nms);
    kept.truncate(params.max_detections);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn labels() -> Vec<String> {
        vec!["person".into(), "dog".into()]
    }

    // Rows: cx, cy, w, h, score(person), score(dog); one column per candidate.
    fn head(cols: &[[f32; 6]]) -> Array2<f32> {
        let mut a = Array2::<f32>::zeros((6, cols.len()));
        for (i, c) in cols.iter().enumerate() {
            for (r, v) in c.iter().enumerate() {
                a[[r, i]] = *v;
            }
        }
        a
    }

    #[test]
    fn decodes_boxes_and_labels() {
        let a = head(&[[100.0, 100.0, 20.0, 40.0, 0.1, 0.8]]);
        let params = YoloParams { conf_threshold: 0.25, ..Default::default() };
        let out = decode_head(a.view(), 2.0, 0.5, &labels(), &params);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class_name, "dog");
        assert_eq!(<[f32; 4]>::from(out[0].bbox), [180.0, 40.0, 220.0, 60.0]);
    }

    #[test]
    fn applies_floor_nms_and_cap() {
        let a = head(&[
            [50.0, 50.0, 20.0, 20.0, 0.9, 0.0],
            [51.0, 50.0, 20.0, 20.0, 0.8, 0.0],  // overlaps the first
            [300.0, 300.0, 20.0, 20.0, 0.7, 0.0],
            [500.0, 500.0, 20.0, 20.0, 0.2, 0.0], // below floor
        ]);
        let params = YoloParams { conf_threshold: 0.25, iou_threshold: 0.45, ..Default::default() };
        let out = decode_head(a.view(), 1.0, 1.0, &labels(), &params);
        assert_eq!(out.iter().map(|d| d.confidence).collect::<Vec<_>>(), vec![0.9, 0.7]);

        let capped = YoloParams { max_detections: 1, ..params };
        assert_eq!(decode_head(a.view(), 1.0, 1.0, &labels(), &capped).len(), 1);
    }

    #[test]
    fn unknown_class_gets_placeholder_label() {
        let mut a = Array2::<f32>::zeros((7, 1));
        a[[2, 0]] = 4.0;
        a[[3, 0]] = 4.0;
        a[[6, 0]] = 0.9;
        let out = decode_head(a.view(), 1.0, 1.0, &labels(), &YoloParams::default());
        assert_eq!(out[0].class_name, "class_2");
    }
}
