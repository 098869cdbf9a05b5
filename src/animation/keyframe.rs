use crate::animation::ease::Ease;
use crate::foundation::core::{Bounds, Color};
use crate::foundation::math::lerp_f64;

/// Interpolation contract for animated value types.
pub trait Lerp: Sized {
    /// Interpolate from `a` to `b` with normalized factor `t` in `[0, 1]`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        lerp_f64(*a, *b, t)
    }
}

impl Lerp for Color {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Color::rgba(
            lerp_f64(a.r, b.r, t),
            lerp_f64(a.g, b.g, t),
            lerp_f64(a.b, b.b, t),
            lerp_f64(a.a, b.a, t),
        )
    }
}

/// How a keyframe's stored values are interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum KeyframeKind {
    /// Stored values are the target.
    #[default]
    #[serde(rename = "absolute")]
    Absolute,
    /// Stored values are deltas on top of the chronologically next keyframe (which must be
    /// absolute).
    #[serde(rename = "relativeFront")]
    RelativeToNext,
    /// Stored values are deltas on top of the chronologically previous keyframe (which must be
    /// absolute).
    #[serde(rename = "relativeBack")]
    RelativeToPrevious,
}

/// The animatable property bag of one keyframe.
///
/// Filter values use CSS units: percentages for brightness/grayscale/contrast/invert/saturate/
/// sepia/opacity, degrees for hue rotation and output rotation, pixels for blur and shadow.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyframeProps {
    pub crop_image_x: f64,
    pub crop_image_y: f64,
    pub crop_image_w: f64,
    pub crop_image_h: f64,

    pub output_x: f64,
    pub output_y: f64,
    pub output_width: f64,
    pub output_height: f64,
    pub output_rotate: f64,
    pub opacity: f64,

    pub blur: f64,
    pub brightness: f64,
    pub grayscale: f64,
    pub hue_rotation: f64,
    pub contrast: f64,
    pub invert: f64,
    pub saturate: f64,
    pub sepia: f64,

    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
    pub shadow_blur: f64,
    pub shadow_color: Color,
}

impl Default for KeyframeProps {
    fn default() -> Self {
        Self {
            crop_image_x: 0.0,
            crop_image_y: 0.0,
            crop_image_w: 0.0,
            crop_image_h: 0.0,
            output_x: 0.0,
            output_y: 0.0,
            output_width: 240.0,
            output_height: 140.0,
            output_rotate: 0.0,
            opacity: 100.0,
            blur: 0.0,
            brightness: 100.0,
            grayscale: 0.0,
            hue_rotation: 0.0,
            contrast: 100.0,
            invert: 0.0,
            saturate: 100.0,
            sepia: 0.0,
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
            shadow_blur: 0.0,
            shadow_color: Color::TRANSPARENT,
        }
    }
}

impl KeyframeProps {
    /// Defaults for a freshly loaded source: crop covers the whole frame.
    pub fn for_source(width: u32, height: u32) -> Self {
        Self {
            crop_image_w: f64::from(width),
            crop_image_h: f64::from(height),
            ..Self::default()
        }
    }

    pub fn crop(&self) -> Bounds {
        Bounds::new(
            self.crop_image_x,
            self.crop_image_y,
            self.crop_image_w,
            self.crop_image_h,
        )
    }

    pub fn output(&self) -> Bounds {
        Bounds::new(
            self.output_x,
            self.output_y,
            self.output_width,
            self.output_height,
        )
    }

    /// All-zero deltas, the neutral element of [`KeyframeProps::offset_by`].
    pub fn zero() -> Self {
        Self {
            output_width: 0.0,
            output_height: 0.0,
            opacity: 0.0,
            brightness: 0.0,
            contrast: 0.0,
            saturate: 0.0,
            ..Self::default()
        }
    }

    /// Every numeric field of `delta` added onto `self`; used to resolve relative keyframes.
    pub fn offset_by(&self, delta: &KeyframeProps) -> KeyframeProps {
        KeyframeProps {
            crop_image_x: self.crop_image_x + delta.crop_image_x,
            crop_image_y: self.crop_image_y + delta.crop_image_y,
            crop_image_w: self.crop_image_w + delta.crop_image_w,
            crop_image_h: self.crop_image_h + delta.crop_image_h,
            output_x: self.output_x + delta.output_x,
            output_y: self.output_y + delta.output_y,
            output_width: self.output_width + delta.output_width,
            output_height: self.output_height + delta.output_height,
            output_rotate: self.output_rotate + delta.output_rotate,
            opacity: self.opacity + delta.opacity,
            blur: self.blur + delta.blur,
            brightness: self.brightness + delta.brightness,
            grayscale: self.grayscale + delta.grayscale,
            hue_rotation: self.hue_rotation + delta.hue_rotation,
            contrast: self.contrast + delta.contrast,
            invert: self.invert + delta.invert,
            saturate: self.saturate + delta.saturate,
            sepia: self.sepia + delta.sepia,
            shadow_offset_x: self.shadow_offset_x + delta.shadow_offset_x,
            shadow_offset_y: self.shadow_offset_y + delta.shadow_offset_y,
            shadow_blur: self.shadow_blur + delta.shadow_blur,
            shadow_color: self.shadow_color.saturating_add(delta.shadow_color),
        }
    }
}

impl Lerp for KeyframeProps {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        let f = |x: f64, y: f64| lerp_f64(x, y, t);
        Self {
            crop_image_x: f(a.crop_image_x, b.crop_image_x),
            crop_image_y: f(a.crop_image_y, b.crop_image_y),
            crop_image_w: f(a.crop_image_w, b.crop_image_w),
            crop_image_h: f(a.crop_image_h, b.crop_image_h),
            output_x: f(a.output_x, b.output_x),
            output_y: f(a.output_y, b.output_y),
            output_width: f(a.output_width, b.output_width),
            output_height: f(a.output_height, b.output_height),
            output_rotate: f(a.output_rotate, b.output_rotate),
            opacity: f(a.opacity, b.opacity),
            blur: f(a.blur, b.blur),
            brightness: f(a.brightness, b.brightness),
            grayscale: f(a.grayscale, b.grayscale),
            hue_rotation: f(a.hue_rotation, b.hue_rotation),
            contrast: f(a.contrast, b.contrast),
            invert: f(a.invert, b.invert),
            saturate: f(a.saturate, b.saturate),
            sepia: f(a.sepia, b.sepia),
            shadow_offset_x: f(a.shadow_offset_x, b.shadow_offset_x),
            shadow_offset_y: f(a.shadow_offset_y, b.shadow_offset_y),
            shadow_blur: f(a.shadow_blur, b.shadow_blur),
            shadow_color: Color::lerp(&a.shadow_color, &b.shadow_color, t),
        }
    }
}

/// Largest accepted drop-shadow blur radius, in pixels.
pub const MAX_SHADOW_BLUR_PX: f64 = 100.0;

/// One property snapshot on a clip's local timeline.
///
/// `time_point` and `duration` are percentages of the clip's visible duration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: KeyframeKind,
    #[serde(rename = "timePoint")]
    pub time_point: f64,
    #[serde(rename = "timeAnimation")]
    pub duration: f64,
    #[serde(default)]
    pub ease: Ease,
    #[serde(flatten)]
    pub props: KeyframeProps,
}

impl Keyframe {
    /// The implicit base keyframe every clip starts with.
    pub fn base(props: KeyframeProps) -> Self {
        Self {
            id: new_keyframe_id(),
            kind: KeyframeKind::Absolute,
            time_point: 0.0,
            duration: 0.0,
            ease: Ease::LINEAR,
            props,
        }
    }

    /// `[time_point, time_point + duration)` in percent.
    pub fn interval(&self) -> (f64, f64) {
        (self.time_point, self.time_point + self.duration)
    }

    /// Whether the shadow blur is usable: within `[0, MAX_SHADOW_BLUR_PX]`, or within that
    /// magnitude for a relative keyframe's delta.
    pub fn shadow_blur_fits(&self) -> bool {
        let v = self.props.shadow_blur;
        let lo = match self.kind {
            KeyframeKind::Absolute => 0.0,
            _ => -MAX_SHADOW_BLUR_PX,
        };
        v.is_finite() && (lo..=MAX_SHADOW_BLUR_PX).contains(&v)
    }
}

pub(crate) fn new_keyframe_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whether a keyframe interval `[start, start+duration)` may be placed among `keyframes`, ignoring
/// the entry at `except`.
///
/// The interval must lie inside `[0, 100]`, must not intersect another interval and must not
/// share a start point with another keyframe (start points order keyframes).
pub fn interval_fits(keyframes: &[Keyframe], except: Option<usize>, start: f64, duration: f64) -> bool {
    if !start.is_finite() || !duration.is_finite() {
        return false;
    }
    let end = start + duration;
    if start < 0.0 || duration < 0.0 || end > 100.0 {
        return false;
    }
    keyframes
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != except)
        .all(|(_, k)| {
            let (s, e) = k.interval();
            let overlaps = start < e && s < end;
            !overlaps && s != start
        })
}

#[cfg(test)]
#[path = "../../tests/unit/animation/keyframe.rs"]
mod tests;
