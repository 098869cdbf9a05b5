//! Clip drawing shared by the preview, main-thread export and worker export paths.

use std::sync::Arc;

use crate::animation::keyframe::KeyframeProps;
use crate::foundation::core::{Affine, Point, Rgba8Premul};
use crate::foundation::error::CliplaneResult;
use crate::render::filters::{
    DropShadow, apply_color_chain, clip_color_chain, drop_shadow, gaussian_blur,
    premul_over_in_place,
};
use crate::render::surface::Surface;
use rayon::prelude::*;

/// Everything needed to draw one clip for one frame.
///
/// This is plain data: it owns a snapshot of the source image, so it can be moved to another
/// thread without touching the live clip.
#[derive(Clone, Debug)]
pub struct ClipDraw {
    pub props: KeyframeProps,
    pub image: Arc<Surface>,
}

/// Global view transform: `scale` about the origin, then pan by `(offset_x, offset_y)`.
pub fn view_transform(scale: f64, offset_x: f64, offset_y: f64) -> Affine {
    Affine::scale(scale) * Affine::translate((offset_x, offset_y))
}

/// Transform from the clip's output space `(0,0,w,h)` to surface pixels.
pub fn clip_transform(view: Affine, props: &KeyframeProps) -> Affine {
    view * Affine::translate((props.output_x, props.output_y))
        * Affine::rotate(props.output_rotate.to_radians())
}

/// Draw `clip` onto `target` through `view`.
///
/// The cropped source rectangle is scaled into the output rectangle, rotated about the output
/// origin, filtered (blur, color filters, opacity, drop shadow) as one layer and composited
/// source-over.
pub fn draw_clip(target: &mut Surface, clip: &ClipDraw, view: Affine) -> CliplaneResult<()> {
    let p = &clip.props;
    if p.output_width <= 0.0
        || p.output_height <= 0.0
        || p.crop_image_w <= 0.0
        || p.crop_image_h <= 0.0
        || p.opacity <= 0.0
        || target.data.is_empty()
    {
        return Ok(());
    }

    let xf = clip_transform(view, p);
    if xf.determinant().abs() < 1e-12 {
        return Ok(());
    }

    let mut layer = Surface::new(target.width, target.height);
    let Some(bbox) = pixel_bounds(xf, p.output_width, p.output_height, target) else {
        return Ok(());
    };
    rasterize(&mut layer, clip, xf.inverse(), bbox);

    if p.blur > 0.0 {
        gaussian_blur(&mut layer, p.blur)?;
    }
    apply_color_chain(&mut layer, &clip_color_chain(p));
    if let Some(shadow) = DropShadow::from_props(p) {
        drop_shadow(&mut layer, &shadow)?;
    }

    premul_over_in_place(&mut target.data, &layer.data, 1.0)
}

/// Fill `target` with `background`, then draw `clips` in order (later clips on top).
pub fn composite(
    target: &mut Surface,
    background: Rgba8Premul,
    view: Affine,
    clips: &[ClipDraw],
) -> CliplaneResult<()> {
    target.fill(background);
    for clip in clips {
        draw_clip(target, clip, view)?;
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct PixelBox {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

fn pixel_bounds(xf: Affine, w: f64, h: f64, target: &Surface) -> Option<PixelBox> {
    let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)].map(|(x, y)| xf * Point::new(x, y));
    let min_x = corners.iter().map(|c| c.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|c| c.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|c| c.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|c| c.y).fold(f64::NEG_INFINITY, f64::max);

    let x0 = min_x.floor().max(0.0);
    let y0 = min_y.floor().max(0.0);
    let x1 = max_x.ceil().min(f64::from(target.width));
    let y1 = max_y.ceil().min(f64::from(target.height));
    if !(x0 < x1 && y0 < y1) {
        return None;
    }
    Some(PixelBox {
        x0: x0 as u32,
        y0: y0 as u32,
        x1: x1 as u32,
        y1: y1 as u32,
    })
}

/// Inverse-map every pixel center in `bbox` into output space and sample the crop rectangle.
fn rasterize(layer: &mut Surface, clip: &ClipDraw, inv: Affine, bbox: PixelBox) {
    let p = &clip.props;
    let img = clip.image.as_ref();
    let sx = p.crop_image_w / p.output_width;
    let sy = p.crop_image_h / p.output_height;
    let row_len = layer.width as usize * 4;

    // Filtering never reads texels outside the crop rectangle.
    let lim = TexelRect {
        x0: (p.crop_image_x.floor() as i64).max(0),
        y0: (p.crop_image_y.floor() as i64).max(0),
        x1: ((p.crop_image_x + p.crop_image_w).ceil() as i64 - 1).min(i64::from(img.width) - 1),
        y1: ((p.crop_image_y + p.crop_image_h).ceil() as i64 - 1).min(i64::from(img.height) - 1),
    };
    if lim.x1 < lim.x0 || lim.y1 < lim.y0 {
        return;
    }

    layer
        .data
        .par_chunks_mut(row_len)
        .enumerate()
        .skip(bbox.y0 as usize)
        .take((bbox.y1 - bbox.y0) as usize)
        .for_each(|(y, row)| {
            for x in bbox.x0..bbox.x1 {
                let local = inv * Point::new(f64::from(x) + 0.5, y as f64 + 0.5);
                if local.x < 0.0
                    || local.y < 0.0
                    || local.x >= p.output_width
                    || local.y >= p.output_height
                {
                    continue;
                }
                let u = p.crop_image_x + local.x * sx;
                let v = p.crop_image_y + local.y * sy;
                let px = sample_bilinear(img, u, v, lim);
                let o = x as usize * 4;
                row[o..o + 4].copy_from_slice(&px);
            }
        });
}

#[derive(Clone, Copy, Debug)]
struct TexelRect {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

/// Bilinear sample at continuous image coordinates, reading only texels inside `lim`.
/// Coordinates outside the image are transparent.
fn sample_bilinear(img: &Surface, u: f64, v: f64, lim: TexelRect) -> [u8; 4] {
    let w = i64::from(img.width);
    if u < 0.0 || v < 0.0 || u >= img.width as f64 || v >= img.height as f64 {
        return [0; 4];
    }
    let fx = u - 0.5;
    let fy = v - 0.5;
    let bx = fx.floor() as i64;
    let by = fy.floor() as i64;
    let tx = fx - bx as f64;
    let ty = fy - by as f64;
    let x0 = bx.clamp(lim.x0, lim.x1);
    let x1 = (bx + 1).clamp(lim.x0, lim.x1);
    let y0 = by.clamp(lim.y0, lim.y1);
    let y1 = (by + 1).clamp(lim.y0, lim.y1);

    let at = |x: i64, y: i64, c: usize| f64::from(img.data[((y * w + x) as usize) * 4 + c]);
    let mut out = [0u8; 4];
    for (c, o) in out.iter_mut().enumerate() {
        let top = at(x0, y0, c) * (1.0 - tx) + at(x1, y0, c) * tx;
        let bottom = at(x0, y1, c) * (1.0 - tx) + at(x1, y1, c) * tx;
        *o = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/draw.rs"]
mod tests;
