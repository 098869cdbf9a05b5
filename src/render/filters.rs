//! CPU filter kernels over premultiplied RGBA8 buffers.
//!
//! Color filters are 4x5 affine matrices over straight-alpha `[r, g, b, a, 1]`. A clip's filters
//! run as a chain in one pass per pixel, clamping to `[0, 1]` after every stage the way a canvas
//! filter list does. Spatial filters (blur, drop shadow) run on whole layers.

use crate::animation::keyframe::KeyframeProps;
use crate::foundation::core::Color;
use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::foundation::math::{add_sat_u8, mul_div255_u8};
use crate::render::surface::Surface;
use rayon::prelude::*;

pub type ColorMatrix = [f32; 20];

pub const IDENTITY: ColorMatrix = [
    1.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, 0.0, //
];

fn rgb_matrix(m: [f32; 9]) -> ColorMatrix {
    [
        m[0], m[1], m[2], 0.0, 0.0, //
        m[3], m[4], m[5], 0.0, 0.0, //
        m[6], m[7], m[8], 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0, //
    ]
}

/// `brightness(pct%)`.
pub fn brightness(pct: f64) -> ColorMatrix {
    let b = (pct / 100.0).max(0.0) as f32;
    rgb_matrix([b, 0.0, 0.0, 0.0, b, 0.0, 0.0, 0.0, b])
}

/// `contrast(pct%)`.
pub fn contrast(pct: f64) -> ColorMatrix {
    let c = (pct / 100.0).max(0.0) as f32;
    let o = 0.5 - 0.5 * c;
    [
        c, 0.0, 0.0, 0.0, o, //
        0.0, c, 0.0, 0.0, o, //
        0.0, 0.0, c, 0.0, o, //
        0.0, 0.0, 0.0, 1.0, 0.0, //
    ]
}

/// `grayscale(pct%)`.
pub fn grayscale(pct: f64) -> ColorMatrix {
    let a = 1.0 - (pct / 100.0).clamp(0.0, 1.0) as f32;
    rgb_matrix([
        0.2126 + 0.7874 * a,
        0.7152 - 0.7152 * a,
        0.0722 - 0.0722 * a,
        0.2126 - 0.2126 * a,
        0.7152 + 0.2848 * a,
        0.0722 - 0.0722 * a,
        0.2126 - 0.2126 * a,
        0.7152 - 0.7152 * a,
        0.0722 + 0.9278 * a,
    ])
}

/// `sepia(pct%)`.
pub fn sepia(pct: f64) -> ColorMatrix {
    let a = 1.0 - (pct / 100.0).clamp(0.0, 1.0) as f32;
    rgb_matrix([
        0.393 + 0.607 * a,
        0.769 - 0.769 * a,
        0.189 - 0.189 * a,
        0.349 - 0.349 * a,
        0.686 + 0.314 * a,
        0.168 - 0.168 * a,
        0.272 - 0.272 * a,
        0.534 - 0.534 * a,
        0.131 + 0.869 * a,
    ])
}

/// `saturate(pct%)`.
pub fn saturate(pct: f64) -> ColorMatrix {
    let s = (pct / 100.0).max(0.0) as f32;
    rgb_matrix([
        0.213 + 0.787 * s,
        0.715 - 0.715 * s,
        0.072 - 0.072 * s,
        0.213 - 0.213 * s,
        0.715 + 0.285 * s,
        0.072 - 0.072 * s,
        0.213 - 0.213 * s,
        0.715 - 0.715 * s,
        0.072 + 0.928 * s,
    ])
}

/// `hue-rotate(deg)`.
pub fn hue_rotate(deg: f64) -> ColorMatrix {
    let (sin, cos) = deg.to_radians().sin_cos();
    let (s, c) = (sin as f32, cos as f32);
    rgb_matrix([
        0.213 + c * 0.787 - s * 0.213,
        0.715 - c * 0.715 - s * 0.715,
        0.072 - c * 0.072 + s * 0.928,
        0.213 - c * 0.213 + s * 0.143,
        0.715 + c * 0.285 + s * 0.140,
        0.072 - c * 0.072 - s * 0.283,
        0.213 - c * 0.213 - s * 0.787,
        0.715 - c * 0.715 + s * 0.715,
        0.072 + c * 0.928 + s * 0.072,
    ])
}

/// `invert(pct%)`.
pub fn invert(pct: f64) -> ColorMatrix {
    let a = (pct / 100.0).clamp(0.0, 1.0) as f32;
    let k = 1.0 - 2.0 * a;
    [
        k, 0.0, 0.0, 0.0, a, //
        0.0, k, 0.0, 0.0, a, //
        0.0, 0.0, k, 0.0, a, //
        0.0, 0.0, 0.0, 1.0, 0.0, //
    ]
}

/// `opacity(pct%)`.
pub fn opacity(pct: f64) -> ColorMatrix {
    let o = (pct / 100.0).clamp(0.0, 1.0) as f32;
    let mut m = IDENTITY;
    m[18] = o;
    m
}

pub fn is_identity(m: &ColorMatrix) -> bool {
    let eps = 1.0e-6;
    m.iter().zip(IDENTITY.iter()).all(|(a, b)| (*a - *b).abs() <= eps)
}

/// The color stages of a clip's filter chain in drawing order, identity stages dropped:
/// brightness, grayscale, hue-rotate, contrast, invert, saturate, sepia, opacity.
pub fn clip_color_chain(p: &KeyframeProps) -> Vec<ColorMatrix> {
    [
        brightness(p.brightness),
        grayscale(p.grayscale),
        hue_rotate(p.hue_rotation),
        contrast(p.contrast),
        invert(p.invert),
        saturate(p.saturate),
        sepia(p.sepia),
        opacity(p.opacity),
    ]
    .into_iter()
    .filter(|m| !is_identity(m))
    .collect()
}

fn apply_stage(m: &ColorMatrix, [r, g, b, a]: [f32; 4]) -> [f32; 4] {
    let row = |i: usize| {
        (m[i] * r + m[i + 1] * g + m[i + 2] * b + m[i + 3] * a + m[i + 4]).clamp(0.0, 1.0)
    };
    [row(0), row(5), row(10), row(15)]
}

/// Apply `chain` in order to every non-transparent pixel in place.
pub fn apply_color_chain(surface: &mut Surface, chain: &[ColorMatrix]) {
    if chain.iter().all(is_identity) {
        return;
    }
    surface.data.par_chunks_mut(4).for_each(|d| {
        if d[3] == 0 {
            return;
        }
        let pa = f32::from(d[3]) / 255.0;
        let inv_a = 1.0 / pa;
        let straight = [
            f32::from(d[0]) / 255.0 * inv_a,
            f32::from(d[1]) / 255.0 * inv_a,
            f32::from(d[2]) / 255.0 * inv_a,
            pa,
        ];
        let [r, g, b, a] = chain.iter().fold(straight, |px, m| apply_stage(m, px));

        d[0] = (r * a * 255.0).round().clamp(0.0, 255.0) as u8;
        d[1] = (g * a * 255.0).round().clamp(0.0, 255.0) as u8;
        d[2] = (b * a * 255.0).round().clamp(0.0, 255.0) as u8;
        d[3] = (a * 255.0).round().clamp(0.0, 255.0) as u8;
    });
}

/// Apply a single matrix to every non-transparent pixel in place.
pub fn apply_color_matrix(surface: &mut Surface, m: &ColorMatrix) {
    apply_color_chain(surface, std::slice::from_ref(m));
}

/// Gaussian blur with standard deviation `sigma` pixels (`blur(sigma px)`), edge-clamped.
pub fn gaussian_blur(surface: &mut Surface, sigma: f64) -> CliplaneResult<()> {
    if !sigma.is_finite() || sigma <= 0.0 || surface.data.is_empty() {
        return Ok(());
    }
    // A kernel wider than the surface only re-reads clamped edge pixels.
    let max_radius = surface.width.max(surface.height);
    let radius = match (sigma * 3.0).ceil() {
        r if r >= f64::from(max_radius) => max_radius,
        r => r as u32,
    };
    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; surface.data.len()];
    horizontal_pass(&surface.data, &mut tmp, surface.width, &kernel);
    vertical_pass(&tmp, &mut surface.data, surface.width, surface.height, &kernel);
    Ok(())
}

fn gaussian_kernel_q16(radius: u32, sigma: f64) -> CliplaneResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(CliplaneError::validation("blur sigma must be > 0"));
    }

    let r = i32::try_from(radius)
        .map_err(|_| CliplaneError::validation(format!("blur radius {radius} is too large")))?;
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(CliplaneError::validation("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Keep the kernel exactly normalized so flat regions stay flat.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let row_len = width as usize * 4;
    dst.par_chunks_mut(row_len)
        .zip(src.par_chunks(row_len))
        .for_each(|(out_row, in_row)| {
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                    let idx = sx as usize * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(in_row[idx + c]);
                    }
                }
                let o = x as usize * 4;
                for c in 0..4 {
                    out_row[o + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as usize;
    let h = height as i32;
    dst.par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, out_row)| {
            let y = y as i32;
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y + ki as i32 - radius).clamp(0, h - 1) as usize;
                    let idx = (sy * w + x) * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                    }
                }
                for c in 0..4 {
                    out_row[x * 4 + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

/// Drop-shadow parameters in surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropShadow {
    pub dx: f64,
    pub dy: f64,
    /// CSS blur radius; the Gaussian sigma is half of it.
    pub blur: f64,
    pub color: Color,
}

impl DropShadow {
    pub fn from_props(p: &KeyframeProps) -> Option<Self> {
        if p.shadow_color.a <= 0.0 {
            return None;
        }
        Some(Self {
            dx: p.shadow_offset_x,
            dy: p.shadow_offset_y,
            blur: p.shadow_blur.max(0.0),
            color: p.shadow_color,
        })
    }
}

/// Paint a tinted, offset, blurred copy of `layer`'s alpha underneath it.
pub fn drop_shadow(layer: &mut Surface, shadow: &DropShadow) -> CliplaneResult<()> {
    let w = layer.width as i64;
    let h = layer.height as i64;
    let dx = shadow.dx.round() as i64;
    let dy = shadow.dy.round() as i64;
    let tint = shadow.color.to_rgba8_premul().to_array();

    let mut sh = Surface::new(layer.width, layer.height);
    for y in 0..h {
        let sy = y - dy;
        if sy < 0 || sy >= h {
            continue;
        }
        for x in 0..w {
            let sx = x - dx;
            if sx < 0 || sx >= w {
                continue;
            }
            let a = u16::from(layer.data[((sy * w + sx) as usize) * 4 + 3]);
            if a == 0 {
                continue;
            }
            let o = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                sh.data[o + c] = mul_div255_u8(u16::from(tint[c]), a);
            }
        }
    }
    gaussian_blur(&mut sh, shadow.blur / 2.0)?;

    premul_over_in_place(&mut sh.data, &layer.data, 1.0)?;
    layer.data = sh.data;
    Ok(())
}

/// `dst = src over dst` with an extra `opacity` factor on `src`.
pub fn premul_over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> CliplaneResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(CliplaneError::validation(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    let op = ((opacity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    if op == 0 {
        return Ok(());
    }

    dst.par_chunks_mut(4)
        .zip(src.par_chunks(4))
        .for_each(|(d, s)| {
            let sa = mul_div255_u8(u16::from(s[3]), op);
            if sa == 0 {
                return;
            }
            let inv = 255u16 - u16::from(sa);

            d[3] = add_sat_u8(u16::from(sa), u16::from(mul_div255_u8(u16::from(d[3]), inv)));
            for c in 0..3 {
                let sc = mul_div255_u8(u16::from(s[c]), op);
                let dc = mul_div255_u8(u16::from(d[c]), inv);
                d[c] = add_sat_u8(u16::from(sc), u16::from(dc));
            }
        });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/filters.rs"]
mod tests;
