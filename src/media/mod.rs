//! Decodable media sources.
//!
//! A clip drives its source like a media element: seek, play, pause, and grab the current frame.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::render::surface::Surface;

/// `ffprobe`/`ffmpeg` backed video source.
pub mod ffmpeg;
/// Still images decoded with `image`.
pub mod still;
/// Synthetic solid-color source.
pub mod synthetic;

pub use self::ffmpeg::FfmpegVideoSource;
pub use self::still::ImageSource;
pub use self::synthetic::ColorSource;

/// Intrinsic properties known once a source has loaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MediaInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Intrinsic length in milliseconds.
    pub duration_ms: f64,
}

/// Capability contract of a decodable media source.
pub trait MediaSource: Send {
    fn info(&self) -> MediaInfo;

    /// Where the source came from, if it can be reopened (used by project export).
    fn uri(&self) -> Option<&str> {
        None
    }

    /// Current media position in milliseconds.
    fn position_ms(&self) -> f64;

    fn seek(&mut self, ms: f64);

    fn play(&mut self);

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Snapshot of the frame at the current position.
    fn current_frame(&mut self) -> CliplaneResult<Arc<Surface>>;
}

/// Media-element style position bookkeeping shared by the built-in sources.
///
/// While playing, the position advances with wall-clock time and stops at the end of the media.
#[derive(Clone, Debug)]
pub(crate) struct Playhead {
    position_ms: f64,
    duration_ms: f64,
    playing_since: Option<Instant>,
}

impl Playhead {
    pub(crate) fn new(duration_ms: f64) -> Self {
        Self {
            position_ms: 0.0,
            duration_ms: duration_ms.max(0.0),
            playing_since: None,
        }
    }

    pub(crate) fn position_ms(&self) -> f64 {
        let drift = self
            .playing_since
            .map(|t0| t0.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        (self.position_ms + drift).min(self.duration_ms)
    }

    pub(crate) fn seek(&mut self, ms: f64) {
        self.position_ms = ms.clamp(0.0, self.duration_ms);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    pub(crate) fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
    }

    pub(crate) fn pause(&mut self) {
        if self.playing_since.is_some() {
            self.position_ms = self.position_ms();
            self.playing_since = None;
        }
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }
}

/// Broad class of a media file, decided from its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

impl MediaKind {
    pub fn from_path(path: &Path) -> CliplaneResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Video)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Image)
        } else {
            Err(CliplaneError::load(format!(
                "unsupported media type '{}' (expected one of: {}, {})",
                path.display(),
                VIDEO_EXTENSIONS.join(", "),
                IMAGE_EXTENSIONS.join(", ")
            )))
        }
    }
}

/// Open a media file as a boxed source, dispatching on its extension.
///
/// Still images get `image_duration_ms` as their intrinsic length.
pub fn open_media(path: &Path, image_duration_ms: f64) -> CliplaneResult<Box<dyn MediaSource>> {
    match MediaKind::from_path(path)? {
        MediaKind::Video => Ok(Box::new(FfmpegVideoSource::open(path)?)),
        MediaKind::Image => Ok(Box::new(ImageSource::open(path, image_duration_ms)?)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/mod.rs"]
mod tests;
