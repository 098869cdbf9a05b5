//! Edit-target setters: every per-keyframe write goes to the keyframe at
//! `current_keyframe_index`.

use crate::animation::ease::Ease;
use crate::animation::keyframe::{
    Keyframe, KeyframeKind, KeyframeProps, MAX_SHADOW_BLUR_PX, interval_fits, new_keyframe_id,
};
use crate::foundation::core::Color;
use crate::foundation::error::CliplaneResult;
use crate::foundation::math::wrap_degrees;
use crate::timeline::Mutation;
use crate::timeline::clip::{Clip, ClipEvent};

/// Events fired after the edit target changes, one per per-keyframe property.
const EDIT_TARGET_EVENTS: &[ClipEvent] = &[
    ClipEvent::CropImageHChanged,
    ClipEvent::CropImageWChanged,
    ClipEvent::CropImageXChanged,
    ClipEvent::CropImageYChanged,
    ClipEvent::OutputXChanged,
    ClipEvent::OutputYChanged,
    ClipEvent::OutputHeightChanged,
    ClipEvent::OutputWidthChanged,
    ClipEvent::OutputRotateChanged,
    ClipEvent::OpacityChanged,
    ClipEvent::TimePointChanged,
    ClipEvent::TimeAnimationChanged,
    ClipEvent::EaseChanged,
    ClipEvent::KindChanged,
    ClipEvent::BlurChanged,
    ClipEvent::BrightnessChanged,
    ClipEvent::GrayscaleChanged,
    ClipEvent::HueRotationChanged,
    ClipEvent::ContrastChanged,
    ClipEvent::InvertChanged,
    ClipEvent::SaturateChanged,
    ClipEvent::SepiaChanged,
    ClipEvent::ShadowOffsetXChanged,
    ClipEvent::ShadowOffsetYChanged,
    ClipEvent::ShadowBlurChanged,
    ClipEvent::ShadowColorChanged,
];

impl Clip {
    fn edit_prop<F>(&mut self, event: ClipEvent, value: f64, range: Option<(f64, f64)>, field: F) -> Mutation
    where
        F: FnOnce(&mut KeyframeProps) -> &mut f64,
    {
        if self.recording || !value.is_finite() {
            return Mutation::Rejected;
        }
        if let Some((lo, hi)) = range
            && !(lo..=hi).contains(&value)
        {
            return Mutation::Rejected;
        }
        let slot = field(&mut self.keyframes[self.current].props);
        if *slot == value {
            return Mutation::Unchanged;
        }
        *slot = value;
        self.events.emit(event);
        Mutation::Applied
    }

    fn width_range(&self) -> Option<(f64, f64)> {
        Some((0.0, f64::from(self.info.width)))
    }

    fn height_range(&self) -> Option<(f64, f64)> {
        Some((0.0, f64::from(self.info.height)))
    }

    pub fn set_crop_image_x(&mut self, v: f64) -> Mutation {
        let r = self.width_range();
        self.edit_prop(ClipEvent::CropImageXChanged, v, r, |p| &mut p.crop_image_x)
    }

    pub fn set_crop_image_y(&mut self, v: f64) -> Mutation {
        let r = self.height_range();
        self.edit_prop(ClipEvent::CropImageYChanged, v, r, |p| &mut p.crop_image_y)
    }

    pub fn set_crop_image_w(&mut self, v: f64) -> Mutation {
        let r = self.width_range();
        self.edit_prop(ClipEvent::CropImageWChanged, v, r, |p| &mut p.crop_image_w)
    }

    pub fn set_crop_image_h(&mut self, v: f64) -> Mutation {
        let r = self.height_range();
        self.edit_prop(ClipEvent::CropImageHChanged, v, r, |p| &mut p.crop_image_h)
    }

    pub fn set_output_x(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::OutputXChanged, v, None, |p| &mut p.output_x)
    }

    pub fn set_output_y(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::OutputYChanged, v, None, |p| &mut p.output_y)
    }

    pub fn set_output_width(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::OutputWidthChanged, v, None, |p| &mut p.output_width)
    }

    pub fn set_output_height(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::OutputHeightChanged, v, None, |p| &mut p.output_height)
    }

    /// Rotation in degrees about the output origin.
    pub fn set_output_rotate(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::OutputRotateChanged, v, None, |p| &mut p.output_rotate)
    }

    pub fn set_opacity(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::OpacityChanged, v, Some((0.0, 100.0)), |p| &mut p.opacity)
    }

    pub fn set_blur(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::BlurChanged, v, Some((0.0, 5.0)), |p| &mut p.blur)
    }

    pub fn set_brightness(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::BrightnessChanged, v, Some((0.0, 300.0)), |p| &mut p.brightness)
    }

    pub fn set_grayscale(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::GrayscaleChanged, v, Some((0.0, 100.0)), |p| &mut p.grayscale)
    }

    /// Stored modulo 360.
    pub fn set_hue_rotation(&mut self, v: f64) -> Mutation {
        let v = if v.is_finite() { wrap_degrees(v) } else { v };
        self.edit_prop(ClipEvent::HueRotationChanged, v, None, |p| &mut p.hue_rotation)
    }

    pub fn set_contrast(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::ContrastChanged, v, Some((0.0, 100.0)), |p| &mut p.contrast)
    }

    pub fn set_invert(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::InvertChanged, v, Some((0.0, 100.0)), |p| &mut p.invert)
    }

    pub fn set_saturate(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::SaturateChanged, v, Some((0.0, 300.0)), |p| &mut p.saturate)
    }

    pub fn set_sepia(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::SepiaChanged, v, Some((0.0, 100.0)), |p| &mut p.sepia)
    }

    pub fn set_shadow_offset_x(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::ShadowOffsetXChanged, v, None, |p| &mut p.shadow_offset_x)
    }

    pub fn set_shadow_offset_y(&mut self, v: f64) -> Mutation {
        self.edit_prop(ClipEvent::ShadowOffsetYChanged, v, None, |p| &mut p.shadow_offset_y)
    }

    pub fn set_shadow_blur(&mut self, v: f64) -> Mutation {
        let range = Some((0.0, MAX_SHADOW_BLUR_PX));
        self.edit_prop(ClipEvent::ShadowBlurChanged, v, range, |p| &mut p.shadow_blur)
    }

    pub fn set_shadow_color(&mut self, color: Color) -> Mutation {
        if self.recording {
            return Mutation::Rejected;
        }
        let slot = &mut self.keyframes[self.current].props.shadow_color;
        if *slot == color {
            return Mutation::Unchanged;
        }
        *slot = color;
        self.events.emit(ClipEvent::ShadowColorChanged);
        Mutation::Applied
    }

    pub fn set_ease(&mut self, ease: Ease) -> Mutation {
        if self.recording {
            return Mutation::Rejected;
        }
        let slot = &mut self.keyframes[self.current].ease;
        if *slot == ease {
            return Mutation::Unchanged;
        }
        *slot = ease;
        self.events.emit(ClipEvent::EaseChanged);
        Mutation::Applied
    }

    /// [`Clip::set_ease`] from an external name such as `"power2.inOut"`.
    ///
    /// Unknown names are a validation error rather than a silent rejection.
    pub fn set_ease_name(&mut self, name: &str) -> CliplaneResult<Mutation> {
        Ok(self.set_ease(Ease::parse(name)?))
    }

    pub fn set_kind(&mut self, kind: KeyframeKind) -> Mutation {
        if self.recording {
            return Mutation::Rejected;
        }
        let slot = &mut self.keyframes[self.current].kind;
        if *slot == kind {
            return Mutation::Unchanged;
        }
        *slot = kind;
        self.events.emit(ClipEvent::KindChanged);
        Mutation::Applied
    }

    /// Move the edit target's start, in percent of the visible duration.
    pub fn set_time_point(&mut self, percent: f64) -> Mutation {
        let k = &self.keyframes[self.current];
        if percent == k.time_point && !self.recording {
            return Mutation::Unchanged;
        }
        if self.recording || !interval_fits(&self.keyframes, Some(self.current), percent, k.duration) {
            return Mutation::Rejected;
        }
        self.keyframes[self.current].time_point = percent;
        self.events.emit(ClipEvent::TimePointChanged);
        Mutation::Applied
    }

    /// Change the edit target's tween length, in percent of the visible duration.
    pub fn set_time_animation(&mut self, percent: f64) -> Mutation {
        let k = &self.keyframes[self.current];
        if percent == k.duration && !self.recording {
            return Mutation::Unchanged;
        }
        if self.recording || !interval_fits(&self.keyframes, Some(self.current), k.time_point, percent) {
            return Mutation::Rejected;
        }
        self.keyframes[self.current].duration = percent;
        self.events.emit(ClipEvent::TimeAnimationChanged);
        Mutation::Applied
    }

    /// Make keyframe `index` the edit target.
    ///
    /// Fires [`ClipEvent::KeyframeIndexChanged`] followed by a change event for every
    /// per-keyframe property, since all of them now read from another keyframe.
    pub fn select_keyframe(&mut self, index: usize) -> Mutation {
        if self.recording || index >= self.keyframes.len() {
            return Mutation::Rejected;
        }
        if index == self.current {
            return Mutation::Unchanged;
        }
        self.current = index;
        self.events.emit(ClipEvent::KeyframeIndexChanged);
        for &event in EDIT_TARGET_EVENTS {
            self.events.emit(event);
        }
        Mutation::Applied
    }

    /// Insert a zero-length keyframe at `percent`, copying the nearest absolute keyframe.
    ///
    /// Rejected when `percent` falls outside `[0, 100]`, inside another keyframe's tween, or on an
    /// existing start point.
    pub fn add_keyframe_at(&mut self, percent: f64) -> Mutation {
        if self.recording || !interval_fits(&self.keyframes, None, percent, 0.0) {
            return Mutation::Rejected;
        }
        let Some(nearest) = self
            .keyframes
            .iter()
            .filter(|k| k.kind == KeyframeKind::Absolute)
            .min_by(|a, b| {
                (a.time_point - percent)
                    .abs()
                    .total_cmp(&(b.time_point - percent).abs())
            })
        else {
            return Mutation::Rejected;
        };
        let keyframe = Keyframe {
            id: new_keyframe_id(),
            time_point: percent,
            duration: 0.0,
            ..nearest.clone()
        };
        self.keyframes.push(keyframe);
        self.events.emit(ClipEvent::KeyframesChanged);
        Mutation::Applied
    }

    /// Remove the keyframe with `id` and reset the edit target to index 0.
    ///
    /// The last remaining keyframe cannot be removed.
    pub fn remove_keyframe(&mut self, id: &str) -> Mutation {
        if self.recording || self.keyframes.len() <= 1 {
            return Mutation::Rejected;
        }
        let Some(pos) = self.keyframes.iter().position(|k| k.id == id) else {
            return Mutation::Rejected;
        };
        self.keyframes.remove(pos);
        self.current = 0;
        self.events.emit(ClipEvent::KeyframeIndexChanged);
        self.events.emit(ClipEvent::KeyframesChanged);
        Mutation::Applied
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/clip_edit.rs"]
mod tests;
