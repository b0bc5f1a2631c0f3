use image::{imageops::FilterType, RgbImage};

use crate::domain::frame::{FrameSize, Transform};

/// Reduce `image` para que su lado mayor quepa en `max_dim` (nunca amplía) y opcionalmente
/// intercambia los canales R y B para emisores que envían BGR.
pub fn normalize(image: RgbImage, max_dim: u32, force_convert: bool) -> (RgbImage, Transform) {
    let (w, h) = image.dimensions();
    let original = FrameSize { width: w, height: h };

    let longest = w.max(h).max(1);
    let scale = (max_dim.max(1) as f32 / longest as f32).min(1.0);

    let mut out = if scale < 1.0 {
        let nw = ((w as f32 * scale) as u32).max(1);
        let nh = ((h as f32 * scale) as u32).max(1);
        image::imageops::resize(&image, nw, nh, FilterType::Triangle)
    } else {
        image
    };

    if force_convert {
        for pixel in out.pixels_mut() {
            pixel.0.swap(0, 2);
        }
    }

    let processed = FrameSize { width: out.width(), height: out.height() };
    (out, Transform::resized(scale, original, processed))
}
