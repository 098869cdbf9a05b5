//! Cliplane is a timeline video compositor.
//!
//! Media clips are placed on non-overlapping tracks, animated through keyframes and enter/exit
//! transitions, composited on the CPU and exported to MP4 or WebM:
//!
//! - Build a [`Compositor`] and put [`Clip`]s on its [`Track`]s
//! - Drive playback with [`Compositor::pump`] or render single frames with [`Compositor::render_at`]
//! - Export into any [`MediaSink`] ([`InMemorySink`], [`FfmpegSink`]) with [`Compositor::export`]
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
/// Virtual clock and fixed-period timers.
pub mod clock;
/// Transport, preview loop, export orchestration and project documents.
pub mod compositor;
/// Export pipeline and sinks.
pub mod encode;
/// Decodable media sources.
pub mod media;
/// CPU compositing.
pub mod render;
/// Clips and tracks.
pub mod timeline;

pub use crate::foundation::core::{
    Affine, Bounds, Canvas, Color, Fps, FrameIndex, Point, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{CliplaneError, CliplaneResult};
pub use crate::foundation::event::{Emitter, EventName, Subscription};

pub use crate::animation::ease::{Ease, EaseCurve, EaseDir};
pub use crate::animation::keyframe::{
    Keyframe, KeyframeKind, KeyframeProps, MAX_SHADOW_BLUR_PX, interval_fits,
};
pub use crate::animation::presets::{Transition, TransitionPreset};
pub use crate::animation::resolve::{Phase, ResolvedProps};

pub use crate::clock::{Clock, ClockState, Interval};
pub use crate::compositor::project::{ClipDoc, ProjectDoc, TrackDoc, file_resolver};
pub use crate::compositor::{
    AxisSnap, Compositor, CompositorEvent, CompositorOpts, TransportState,
};
pub use crate::encode::audio::{AudioBed, AudioChunk, AudioPacing, AudioPump};
pub use crate::encode::export::{
    ExportArtifact, ExportFormat, ExportOpts, ExportStrategy, key_frame_timestamps_us,
};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{
    AudioSpec, InMemorySink, MediaSink, RecordedFrame, SinkConfig, SinkLog, SinkLogHandle,
};
pub use crate::media::{
    ColorSource, FfmpegVideoSource, ImageSource, MediaInfo, MediaKind, MediaSource, open_media,
};
pub use crate::render::draw::ClipDraw;
pub use crate::render::surface::Surface;
pub use crate::timeline::{Clip, ClipEvent, Mutation, Track, TrackEvent};
