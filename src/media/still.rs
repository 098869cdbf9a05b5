use std::path::Path;
use std::sync::Arc;

use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::media::{MediaInfo, MediaSource, Playhead};
use crate::render::surface::Surface;

/// Default length given to still images when placed on a track.
pub const DEFAULT_IMAGE_DURATION_MS: f64 = 5000.0;

/// A decoded still image presented as a media source of configurable length.
#[derive(Clone, Debug)]
pub struct ImageSource {
    uri: Option<String>,
    info: MediaInfo,
    frame: Arc<Surface>,
    playhead: Playhead,
}

impl ImageSource {
    /// Decode an encoded image (PNG, JPEG, ...) from memory.
    pub fn from_bytes(bytes: &[u8], duration_ms: f64) -> CliplaneResult<Self> {
        let dyn_img = ::image::load_from_memory(bytes)
            .map_err(|e| CliplaneError::load(format!("decode image from memory: {e}")))?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let frame = Surface::from_straight(width, height, rgba.into_raw())?;
        Self::from_surface(frame, duration_ms)
    }

    /// Read and decode an image file.
    pub fn open(path: &Path, duration_ms: f64) -> CliplaneResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| CliplaneError::load(format!("read '{}': {e}", path.display())))?;
        let mut src = Self::from_bytes(&bytes, duration_ms)?;
        src.uri = Some(path.display().to_string());
        Ok(src)
    }

    /// Wrap an already decoded premultiplied surface.
    pub fn from_surface(frame: Surface, duration_ms: f64) -> CliplaneResult<Self> {
        if frame.width == 0 || frame.height == 0 {
            return Err(CliplaneError::load("image has zero width or height"));
        }
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(CliplaneError::load("image duration must be finite and >= 0"));
        }
        Ok(Self {
            uri: None,
            info: MediaInfo {
                width: frame.width,
                height: frame.height,
                duration_ms,
            },
            frame: Arc::new(frame),
            playhead: Playhead::new(duration_ms),
        })
    }
}

impl MediaSource for ImageSource {
    fn info(&self) -> MediaInfo {
        self.info
    }

    fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    fn position_ms(&self) -> f64 {
        self.playhead.position_ms()
    }

    fn seek(&mut self, ms: f64) {
        self.playhead.seek(ms);
    }

    fn play(&mut self) {
        self.playhead.play();
    }

    fn pause(&mut self) {
        self.playhead.pause();
    }

    fn is_playing(&self) -> bool {
        self.playhead.is_playing()
    }

    fn current_frame(&mut self) -> CliplaneResult<Arc<Surface>> {
        Ok(Arc::clone(&self.frame))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/still.rs"]
mod tests;
