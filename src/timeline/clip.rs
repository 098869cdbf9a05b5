use std::sync::Arc;

use crate::animation::keyframe::{Keyframe, KeyframeProps};
use crate::animation::presets::Transition;
use crate::animation::resolve::{Phase, ResolvedProps, resolve_properties};
use crate::foundation::event::{Emitter, EventName};
use crate::foundation::error::CliplaneResult;
use crate::media::{MediaInfo, MediaSource};
use crate::render::draw::ClipDraw;
use crate::render::surface::Surface;
use crate::timeline::Mutation;

/// Drift between the media position and the timeline position tolerated before re-seeking.
pub const SEEK_TOLERANCE_MS: f64 = 50.0;

/// Change notifications of a [`Clip`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipEvent {
    NameChanged,
    OutputXChanged,
    OutputYChanged,
    OutputWidthChanged,
    OutputHeightChanged,
    OutputRotateChanged,
    OpacityChanged,
    CropImageXChanged,
    CropImageYChanged,
    CropImageWChanged,
    CropImageHChanged,
    OffsetTimeChanged,
    HiddenTimeStartChanged,
    HiddenTimeEndChanged,
    KeyframeIndexChanged,
    TimePointChanged,
    TimeAnimationChanged,
    EaseChanged,
    KindChanged,
    KeyframesChanged,
    BlurChanged,
    BrightnessChanged,
    GrayscaleChanged,
    HueRotationChanged,
    ContrastChanged,
    InvertChanged,
    SaturateChanged,
    SepiaChanged,
    ShadowOffsetXChanged,
    ShadowOffsetYChanged,
    ShadowBlurChanged,
    ShadowColorChanged,
    AnimationInChanged,
    AnimationOutChanged,
    RecordingChanged,
}

impl EventName for ClipEvent {
    const ALL: &'static [Self] = &[
        Self::NameChanged,
        Self::OutputXChanged,
        Self::OutputYChanged,
        Self::OutputWidthChanged,
        Self::OutputHeightChanged,
        Self::OutputRotateChanged,
        Self::OpacityChanged,
        Self::CropImageXChanged,
        Self::CropImageYChanged,
        Self::CropImageWChanged,
        Self::CropImageHChanged,
        Self::OffsetTimeChanged,
        Self::HiddenTimeStartChanged,
        Self::HiddenTimeEndChanged,
        Self::KeyframeIndexChanged,
        Self::TimePointChanged,
        Self::TimeAnimationChanged,
        Self::EaseChanged,
        Self::KindChanged,
        Self::KeyframesChanged,
        Self::BlurChanged,
        Self::BrightnessChanged,
        Self::GrayscaleChanged,
        Self::HueRotationChanged,
        Self::ContrastChanged,
        Self::InvertChanged,
        Self::SaturateChanged,
        Self::SepiaChanged,
        Self::ShadowOffsetXChanged,
        Self::ShadowOffsetYChanged,
        Self::ShadowBlurChanged,
        Self::ShadowColorChanged,
        Self::AnimationInChanged,
        Self::AnimationOutChanged,
        Self::RecordingChanged,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::NameChanged => "CHANGE_NAME",
            Self::OutputXChanged => "CHANGE_OUTPUTX",
            Self::OutputYChanged => "CHANGE_OUTPUTY",
            Self::OutputWidthChanged => "CHANGE_OUTPUT_WIDTH",
            Self::OutputHeightChanged => "CHANGE_OUTPUT_HEIGHT",
            Self::OutputRotateChanged => "CHANGE_OUTPUT_ROTATE",
            Self::OpacityChanged => "CHANGE_OPACITY",
            Self::CropImageXChanged => "CHANGE_CROP_IMAGE_X",
            Self::CropImageYChanged => "CHANGE_CROP_IMAGE_Y",
            Self::CropImageWChanged => "CHANGE_CROP_IMAGE_W",
            Self::CropImageHChanged => "CHANGE_CROP_IMAGE_H",
            Self::OffsetTimeChanged => "CHANGE_OFFSET_TIME",
            Self::HiddenTimeStartChanged => "CHANGE_HIDDEN_TIME_START",
            Self::HiddenTimeEndChanged => "CHANGE_HIDDEN_TIME_END",
            Self::KeyframeIndexChanged => "CHANGE_ANIMATION_INDEX",
            Self::TimePointChanged => "CHANGE_TIME_POINT",
            Self::TimeAnimationChanged => "CHANGE_TIME_ANIMATION",
            Self::EaseChanged => "CHANGE_EASE",
            Self::KindChanged => "CHANGE_TYPE",
            Self::KeyframesChanged => "CHANGE_ANIMATIONS_LIST",
            Self::BlurChanged => "CHANGE_FILTER_BLUR",
            Self::BrightnessChanged => "CHANGE_FILTER_BRIGHTNESS",
            Self::GrayscaleChanged => "CHANGE_FILTER_GRAYSCALE",
            Self::HueRotationChanged => "CHANGE_FILTER_HUEROTATION",
            Self::ContrastChanged => "CHANGE_FILTER_CONTRAST",
            Self::InvertChanged => "CHANGE_FILTER_INVERT",
            Self::SaturateChanged => "CHANGE_FILTER_SATURATE",
            Self::SepiaChanged => "CHANGE_FILTER_SEPIA",
            Self::ShadowOffsetXChanged => "CHANGE_SHADOW_OFFSETX",
            Self::ShadowOffsetYChanged => "CHANGE_SHADOW_OFFSETY",
            Self::ShadowBlurChanged => "CHANGE_SHADOW_BLUR",
            Self::ShadowColorChanged => "CHANGE_SHADOW_COLOR",
            Self::AnimationInChanged => "CHANGE_ANIMATION_IN",
            Self::AnimationOutChanged => "CHANGE_ANIMATION_OUT",
            Self::RecordingChanged => "CHANGE_STATE",
        }
    }
}

/// One media source placed on a track.
///
/// A clip only exists once its source has loaded, so its intrinsic size and duration are always
/// known. Placement (`offset`, trim window) is edited through the owning
/// [`Track`](crate::timeline::Track) so that overlap can be checked; per-keyframe properties are
/// edited through the clip's edit target (see [`Clip::current_keyframe_index`]).
pub struct Clip {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) source: Box<dyn MediaSource>,
    pub(crate) info: MediaInfo,
    pub(crate) offset_ms: f64,
    pub(crate) hidden_start_ms: f64,
    pub(crate) hidden_end_ms: f64,
    pub(crate) keyframes: Vec<Keyframe>,
    pub(crate) current: usize,
    pub(crate) enter: Transition,
    pub(crate) exit: Transition,
    pub(crate) recording: bool,
    pub(crate) events: Emitter<ClipEvent>,
}

impl std::fmt::Debug for Clip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clip")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("info", &self.info)
            .field("offset_ms", &self.offset_ms)
            .field("hidden_start_ms", &self.hidden_start_ms)
            .field("hidden_end_ms", &self.hidden_end_ms)
            .field("keyframes", &self.keyframes.len())
            .field("recording", &self.recording)
            .finish()
    }
}

impl Clip {
    /// Wrap a loaded source. The trim window covers the whole media and a single base keyframe
    /// crops the full frame into the default output rectangle.
    pub fn new(name: impl Into<String>, source: Box<dyn MediaSource>) -> Self {
        let info = source.info();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            offset_ms: 0.0,
            hidden_start_ms: 0.0,
            hidden_end_ms: info.duration_ms.max(0.0),
            keyframes: vec![Keyframe::base(KeyframeProps::for_source(
                info.width,
                info.height,
            ))],
            current: 0,
            enter: Transition::default(),
            exit: Transition::default(),
            recording: false,
            events: Emitter::new(),
            source,
            info,
        }
    }

    /// Like [`Clip::new`], named after the source's file stem or a short random id.
    pub fn from_source(source: Box<dyn MediaSource>) -> Self {
        let name = source
            .uri()
            .and_then(|u| std::path::Path::new(u).file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()[..7].to_owned());
        Self::new(name, source)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn events(&self) -> &Emitter<ClipEvent> {
        &self.events
    }

    pub fn info(&self) -> MediaInfo {
        self.info
    }

    pub fn source(&self) -> &dyn MediaSource {
        self.source.as_ref()
    }

    /// Intrinsic media length.
    pub fn resource_duration_ms(&self) -> f64 {
        self.info.duration_ms
    }

    pub fn offset_ms(&self) -> f64 {
        self.offset_ms
    }

    pub fn hidden_start_ms(&self) -> f64 {
        self.hidden_start_ms
    }

    pub fn hidden_end_ms(&self) -> f64 {
        self.hidden_end_ms
    }

    /// Visible length: `hidden_end - hidden_start`.
    pub fn duration_ms(&self) -> f64 {
        self.hidden_end_ms - self.hidden_start_ms
    }

    /// `[offset, offset + duration)` on the track.
    pub fn placement(&self) -> (f64, f64) {
        (self.offset_ms, self.offset_ms + self.duration_ms())
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Index of the keyframe that per-keyframe setters write to.
    pub fn current_keyframe_index(&self) -> usize {
        self.current
    }

    /// The keyframe that per-keyframe setters write to.
    pub fn edit_target(&self) -> &Keyframe {
        &self.keyframes[self.current]
    }

    pub fn animation_in(&self) -> Transition {
        self.enter
    }

    pub fn animation_out(&self) -> Transition {
        self.exit
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Clip-local time for a timeline time.
    pub fn local_ms(&self, time_ms: f64) -> f64 {
        time_ms - self.offset_ms
    }

    /// Effective properties at clip-local `local_ms`, `None` when nothing is drawn.
    ///
    /// This never looks at the edit target.
    pub fn resolve_properties(&self, local_ms: f64) -> Option<ResolvedProps> {
        resolve_properties(
            &self.keyframes,
            self.duration_ms(),
            &self.enter,
            &self.exit,
            local_ms,
        )
    }

    /// Sync the media source to timeline time `time_ms` and snapshot what to draw.
    ///
    /// While the transport plays, the source plays along and is only re-seeked once it drifts
    /// more than [`SEEK_TOLERANCE_MS`]. While recording the source is paused and seeked to the exact
    /// frame position. Outside every visible window the source is paused and rewound to zero.
    pub fn prepare(&mut self, time_ms: f64, playing: bool) -> CliplaneResult<Option<ClipDraw>> {
        let local = self.local_ms(time_ms);
        let Some(resolved) = self.resolve_properties(local) else {
            self.source.pause();
            if self.source.position_ms() != 0.0 {
                self.source.seek(0.0);
            }
            return Ok(None);
        };

        let ideal = local.clamp(0.0, self.duration_ms()) + self.hidden_start_ms;
        let drift = (self.source.position_ms() - ideal).abs();
        if self.recording {
            self.source.pause();
            if drift > 0.0 {
                self.source.seek(ideal);
            }
        } else {
            if drift > SEEK_TOLERANCE_MS {
                self.source.seek(ideal);
            }
            if playing && resolved.phase == Phase::Active {
                self.source.play();
            } else {
                self.source.pause();
            }
        }

        let image: Arc<Surface> = self.source.current_frame()?;
        Ok(Some(ClipDraw {
            props: resolved.props,
            image,
        }))
    }

    pub(crate) fn set_recording(&mut self, recording: bool) {
        if self.recording != recording {
            self.recording = recording;
            if !recording {
                self.source.pause();
            }
            self.events.emit(ClipEvent::RecordingChanged);
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Mutation {
        let name = name.into();
        if name == self.name {
            return Mutation::Unchanged;
        }
        self.name = name;
        self.events.emit(ClipEvent::NameChanged);
        Mutation::Applied
    }

    pub fn set_animation_in(&mut self, transition: Transition) -> Mutation {
        self.write_transition(transition, true)
    }

    pub fn set_animation_out(&mut self, transition: Transition) -> Mutation {
        self.write_transition(transition, false)
    }

    fn write_transition(&mut self, transition: Transition, enter: bool) -> Mutation {
        if self.recording || !transition.duration_ms.is_finite() || transition.duration_ms < 0.0 {
            return Mutation::Rejected;
        }
        let (slot, event) = if enter {
            (&mut self.enter, ClipEvent::AnimationInChanged)
        } else {
            (&mut self.exit, ClipEvent::AnimationOutChanged)
        };
        if *slot == transition {
            return Mutation::Unchanged;
        }
        *slot = transition;
        self.events.emit(event);
        Mutation::Applied
    }

    // Placement writes. Overlap with sibling clips is the track's concern; these only guard the
    // clip's own invariants.

    pub(crate) fn write_offset(&mut self, ms: f64) -> Mutation {
        if self.recording || !ms.is_finite() || ms < 0.0 {
            return Mutation::Rejected;
        }
        if ms == self.offset_ms {
            return Mutation::Unchanged;
        }
        self.offset_ms = ms;
        self.events.emit(ClipEvent::OffsetTimeChanged);
        Mutation::Applied
    }

    pub(crate) fn write_hidden_start(&mut self, ms: f64) -> Mutation {
        if self.recording || !ms.is_finite() || ms < 0.0 || ms > self.hidden_end_ms {
            return Mutation::Rejected;
        }
        if ms == self.hidden_start_ms {
            return Mutation::Unchanged;
        }
        self.hidden_start_ms = ms;
        self.events.emit(ClipEvent::HiddenTimeStartChanged);
        Mutation::Applied
    }

    pub(crate) fn write_hidden_end(&mut self, ms: f64) -> Mutation {
        if self.recording
            || !ms.is_finite()
            || ms < self.hidden_start_ms
            || ms > self.info.duration_ms
        {
            return Mutation::Rejected;
        }
        if ms == self.hidden_end_ms {
            return Mutation::Unchanged;
        }
        self.hidden_end_ms = ms;
        self.events.emit(ClipEvent::HiddenTimeEndChanged);
        Mutation::Applied
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/clip.rs"]
mod tests;
