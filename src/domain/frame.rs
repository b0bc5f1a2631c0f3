use serde::{Deserialize, Serialize};

use super::detection::BBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Jpeg,
    /// Planar I420: full-size Y plane followed by quarter-size U and V planes.
    Yuv420,
}

/// Body of a client `frame` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePayload {
    pub image: String,
    #[serde(default)]
    pub format: FrameFormat,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub force_rgb: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Maps boxes from the processed frame back onto the frame the client sent:
/// `original = (processed - pad) / scale_{x,y}`.
///
/// `scale` is the requested factor. `scale_x` and `scale_y` are what the resize
/// actually produced once pixel sizes were floored, and are the ones to invert with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    #[serde(skip)]
    pub original: Option<FrameSize>,
    #[serde(skip)]
    pub processed: Option<FrameSize>,
}

impl Transform {
    pub fn identity(size: FrameSize) -> Self {
        Self {
            scale: 1.0,
            scale_x: 1.0,
            scale_y: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            original: Some(size),
            processed: Some(size),
        }
    }

    /// Records a plain resize from `original` to `processed`.
    pub fn resized(scale: f32, original: FrameSize, processed: FrameSize) -> Self {
        Self {
            scale,
            scale_x: processed.width as f32 / original.width.max(1) as f32,
            scale_y: processed.height as f32 / original.height.max(1) as f32,
            pad_x: 0.0,
            pad_y: 0.0,
            original: Some(original),
            processed: Some(processed),
        }
    }

    pub fn to_original(&self, b: &BBox) -> BBox {
        BBox {
            x1: (b.x1 - self.pad_x) / self.scale_x,
            y1: (b.y1 - self.pad_y) / self.scale_y,
            x2: (b.x2 - self.pad_x) / self.scale_x,
            y2: (b.y2 - self.pad_y) / self.scale_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_defaults_to_jpeg() {
        let p: FramePayload = serde_json::from_str(r#"{"image":"abc"}"#).unwrap();
        assert_eq!(p.format, FrameFormat::Jpeg);
        assert!(p.width.is_none() && !p.force_rgb);

        let p: FramePayload =
            serde_json::from_str(r#"{"image":"","format":"yuv420","width":4,"height":2}"#).unwrap();
        assert_eq!(p.format, FrameFormat::Yuv420);
        assert_eq!((p.width, p.height), (Some(4), Some(2)));
    }

    #[test]
    fn transform_inverts_scale() {
        let t = Transform::resized(
            0.5,
            FrameSize { width: 200, height: 100 },
            FrameSize { width: 100, height: 50 },
        );
        let b = t.to_original(&BBox::from([10.0, 20.0, 30.0, 40.0]));
        assert_eq!(<[f32; 4]>::from(b), [20.0, 40.0, 60.0, 80.0]);
    }

    #[test]
    fn floored_edge_maps_back_to_the_edge() {
        // 1000x333 at 0.64 floors to 640x213; the bottom row must land on 333.
        let t = Transform::resized(
            0.64,
            FrameSize { width: 1000, height: 333 },
            FrameSize { width: 640, height: 213 },
        );
        let b = t.to_original(&BBox::from([0.0, 0.0, 640.0, 213.0]));
        assert!((b.x2 - 1000.0).abs() < 1e-3);
        assert!((b.y2 - 333.0).abs() < 1e-3);
    }
}
