use crate::animation::ease::{Ease, EaseCurve, EaseDir};
use crate::animation::keyframe::KeyframeProps;
use crate::foundation::error::{CliplaneError, CliplaneResult};

/// Named enter/exit transition. Each preset is a partial property override plus an easing curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionPreset {
    #[default]
    None,
    FadeIn,
    BounceDown,
    BounceUp,
    BounceLeft,
    BounceRight,
    ScaleIn,
    CropIn,
    WrapHorizontal,
    WrapVertical,
    FlipUp,
    FlipDown,
    Newspaper,
}

impl TransitionPreset {
    pub const ALL: [TransitionPreset; 13] = [
        Self::None,
        Self::FadeIn,
        Self::BounceDown,
        Self::BounceUp,
        Self::BounceLeft,
        Self::BounceRight,
        Self::ScaleIn,
        Self::CropIn,
        Self::WrapHorizontal,
        Self::WrapVertical,
        Self::FlipUp,
        Self::FlipDown,
        Self::Newspaper,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::FadeIn => "FADE_IN",
            Self::BounceDown => "BOUNCE_DOWN",
            Self::BounceUp => "BOUNCE_UP",
            Self::BounceLeft => "BOUNCE_LEFT",
            Self::BounceRight => "BOUNCE_RIGHT",
            Self::ScaleIn => "SCALE_IN",
            Self::CropIn => "CROP_IN",
            Self::WrapHorizontal => "WRAP_HORIZONTAL",
            Self::WrapVertical => "WRAP_VERTICAL",
            Self::FlipUp => "FLIP_UP",
            Self::FlipDown => "FLIP_DOWN",
            Self::Newspaper => "NEWSPAPER",
        }
    }

    pub fn parse(s: &str) -> CliplaneResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| CliplaneError::validation(format!("unknown transition preset '{s}'")))
    }

    /// Easing for the transition tween. `None` for the `NONE` preset.
    pub fn ease(self) -> Option<Ease> {
        let out = |curve| Some(Ease::new(curve, EaseDir::Out));
        match self {
            Self::None => None,
            Self::FadeIn | Self::WrapHorizontal | Self::WrapVertical | Self::Newspaper => {
                out(EaseCurve::Power1)
            }
            Self::BounceDown | Self::BounceUp | Self::BounceLeft | Self::BounceRight => {
                out(EaseCurve::Bounce)
            }
            Self::ScaleIn | Self::CropIn => out(EaseCurve::Power4),
            Self::FlipUp | Self::FlipDown => out(EaseCurve::Sine),
        }
    }

    /// `base` with this preset's overrides written over it.
    pub fn apply(self, base: &KeyframeProps) -> KeyframeProps {
        let mut p = *base;
        match self {
            Self::None => {}
            Self::FadeIn => p.opacity = 0.0,
            Self::BounceDown => p.output_y = -400.0,
            Self::BounceUp => p.output_y = 400.0,
            Self::BounceLeft => p.output_x = 400.0,
            Self::BounceRight => p.output_x = -400.0,
            Self::ScaleIn => {
                p.opacity = 0.0;
                p.output_width = 0.0;
                p.output_height = 0.0;
            }
            Self::CropIn => {
                p.opacity = 0.0;
                p.output_width = 0.0;
                p.output_height = 0.0;
                p.crop_image_w = 0.0;
                p.crop_image_h = 0.0;
            }
            Self::WrapHorizontal => p.output_width = 0.0,
            Self::WrapVertical => p.output_height = 0.0,
            Self::FlipUp => {
                p.output_rotate = 90.0;
                p.output_height = 0.0;
            }
            Self::FlipDown => {
                p.output_rotate = -90.0;
                p.output_height = 0.0;
            }
            Self::Newspaper => {
                p.output_rotate = 600.0;
                p.output_width = 300.0;
                p.output_height = 300.0;
                p.output_x = 300.0;
                p.output_y = 300.0;
            }
        }
        p
    }
}

/// Enter or exit transition attached to a clip.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub preset: TransitionPreset,
    /// Length of the transition window in milliseconds.
    pub duration_ms: f64,
}

impl Transition {
    pub fn new(preset: TransitionPreset, duration_ms: f64) -> Self {
        Self {
            preset,
            duration_ms,
        }
    }

    /// A transition that actually draws something: a real preset and a positive window.
    pub fn is_active(&self) -> bool {
        self.preset != TransitionPreset::None && self.duration_ms > 0.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/presets.rs"]
mod tests;
