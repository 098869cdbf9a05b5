use std::sync::Arc;

use crate::foundation::core::Color;
use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::media::{MediaInfo, MediaSource, Playhead};
use crate::render::surface::Surface;

/// Solid-color source of a fixed size and length.
///
/// Handy for tests and demos: it decodes instantly and its frames are known in advance.
#[derive(Clone, Debug)]
pub struct ColorSource {
    info: MediaInfo,
    frame: Arc<Surface>,
    playhead: Playhead,
    seeks: u64,
}

impl ColorSource {
    pub fn new(width: u32, height: u32, duration_ms: f64, color: Color) -> CliplaneResult<Self> {
        if width == 0 || height == 0 {
            return Err(CliplaneError::load("color source width/height must be > 0"));
        }
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(CliplaneError::load(
                "color source duration must be finite and >= 0",
            ));
        }
        Ok(Self {
            info: MediaInfo {
                width,
                height,
                duration_ms,
            },
            frame: Arc::new(Surface::filled(width, height, color.to_rgba8_premul())),
            playhead: Playhead::new(duration_ms),
            seeks: 0,
        })
    }

    /// How many times the source has been seeked.
    pub fn seek_count(&self) -> u64 {
        self.seeks
    }
}

impl MediaSource for ColorSource {
    fn info(&self) -> MediaInfo {
        self.info
    }

    fn position_ms(&self) -> f64 {
        self.playhead.position_ms()
    }

    fn seek(&mut self, ms: f64) {
        self.seeks += 1;
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
