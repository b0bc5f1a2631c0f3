use base64::{prelude::BASE64_STANDARD, Engine};
use image::{ImageFormat, RgbImage};

use crate::domain::{errors::DecodeError, frame::FrameFormat};

/// Quita un prefijo opcional `data:image/...;base64,` y decodifica el resto.
pub fn decode_payload(image: &str) -> Result<Vec<u8>, DecodeError> {
    let body = match image.split_once("base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => image,
    };
    BASE64_STANDARD
        .decode(body.trim())
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))
}

pub fn decode(
    bytes: &[u8],
    format: FrameFormat,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<RgbImage, DecodeError> {
    match format {
        FrameFormat::Jpeg => {
            if bytes.is_empty() {
                return Err(DecodeError::EmptyPayload);
            }
            let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
                .map_err(|e| DecodeError::MalformedImage(e.to_string()))?;
            Ok(img.to_rgb8())
        }
        FrameFormat::Yuv420 => {
            let (Some(w), Some(h)) = (width, height) else {
                return Err(DecodeError::MissingDimensions);
            };
            i420_to_rgb(bytes, w, h)
        }
    }
}

/// Longitud en bytes de un frame I420; los planos de croma redondean hacia arriba.
pub fn i420_len(w: u32, h: u32) -> usize {
    let (w, h) = (w as usize, h as usize);
    let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
    w * h + 2 * cw * ch
}

fn i420_to_rgb(data: &[u8], w: u32, h: u32) -> Result<RgbImage, DecodeError> {
    let expected = i420_len(w, h);
    if w == 0 || h == 0 || data.len() != expected {
        return Err(DecodeError::ShapeMismatch { expected, actual: data.len() });
    }

    let (wu, hu) = (w as usize, h as usize);
    let cw = wu.div_ceil(2);
    let y_plane = &data[..wu * hu];
    let u_plane = &data[wu * hu..wu * hu + cw * hu.div_ceil(2)];
    let v_plane = &data[wu * hu + cw * hu.div_ceil(2)..];

    let mut out = RgbImage::new(w, h);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let (xu, yu) = (x as usize, y as usize);
        let c = (yu / 2) * cw + xu / 2;
        let luma = y_plane[yu * wu + xu] as f32;
        let u = u_plane[c] as f32 - 128.0;
        let v = v_plane[c] as f32 - 128.0;

        // BT.601
        let r = (luma + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g = (luma - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
        let b = (luma + 1.772 * u).clamp(0.0, 255.0) as u8;
        *pixel = image::Rgb([r, g, b]);
    }
    Ok(out)
}
