use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::encode::audio::AudioChunk;
use crate::foundation::core::Fps;
use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::render::surface::Surface;

/// Layout of the audio stream a sink will receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Configuration provided to a [`MediaSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Number of video frames the export will push.
    pub frames: u64,
    /// `None` when the export has no audio bed.
    pub audio: Option<AudioSpec>,
}

/// Encoder/muxer contract of the export path.
///
/// Ordering contract: `push_video` is called with strictly increasing timestamps; `push_audio` in
/// chunk arrival order, interleaved freely with video.
pub trait MediaSink: Send {
    /// Called once before any frame or audio chunk.
    fn begin(&mut self, cfg: SinkConfig) -> CliplaneResult<()>;

    /// Encode one premultiplied frame at `timestamp_us`. `key` forces an intra frame.
    fn push_video(&mut self, frame: &Surface, timestamp_us: i64, key: bool) -> CliplaneResult<()>;

    fn push_audio(&mut self, chunk: &AudioChunk) -> CliplaneResult<()>;

    /// Flush encoders, finalize the container and return its bytes.
    fn finish(&mut self) -> CliplaneResult<Vec<u8>>;

    /// Drop everything produced so far. Called instead of `finish` when an export fails.
    fn abort(&mut self) {}
}

/// One video frame as seen by an [`InMemorySink`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedFrame {
    pub timestamp_us: i64,
    pub key: bool,
    /// Premultiplied RGBA8 pixels.
    pub data: Vec<u8>,
}

/// Everything an [`InMemorySink`] received.
#[derive(Clone, Debug, Default)]
pub struct SinkLog {
    pub config: Option<SinkConfig>,
    pub frames: Vec<RecordedFrame>,
    pub audio: Vec<AudioChunk>,
    pub finished: bool,
    pub aborted: bool,
}

/// Shared view of an [`InMemorySink`]'s log, usable after the sink moved to another thread.
#[derive(Clone, Debug, Default)]
pub struct SinkLogHandle(Arc<Mutex<SinkLog>>);

impl SinkLogHandle {
    fn lock(&self) -> MutexGuard<'_, SinkLog> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the log as it is now.
    pub fn snapshot(&self) -> SinkLog {
        self.lock().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.lock().frames.iter().map(|f| f.timestamp_us).collect()
    }
}

/// Sink that records frames and audio in memory, for tests and debugging.
///
/// `finish` returns the raw frames concatenated.
#[derive(Debug, Default)]
pub struct InMemorySink {
    log: SinkLogHandle,
    /// Injected failure: fail when pushing the frame with this index.
    fail_at_frame: Option<usize>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `push_video` fails on the `n`-th frame (0-based).
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at_frame: Some(n),
            ..Self::default()
        }
    }

    pub fn log(&self) -> SinkLogHandle {
        self.log.clone()
    }
}

impl MediaSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CliplaneResult<()> {
        let mut log = self.log.lock();
        *log = SinkLog {
            config: Some(cfg),
            ..SinkLog::default()
        };
        Ok(())
    }

    fn push_video(&mut self, frame: &Surface, timestamp_us: i64, key: bool) -> CliplaneResult<()> {
        let mut log = self.log.lock();
        let cfg = log
            .config
            .ok_or_else(|| CliplaneError::encode("in-memory sink not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(CliplaneError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if let Some(last) = log.frames.last()
            && timestamp_us <= last.timestamp_us
        {
            return Err(CliplaneError::encode(
                "in-memory sink received out-of-order frame timestamp",
            ));
        }
        if self.fail_at_frame == Some(log.frames.len()) {
            return Err(CliplaneError::encode("injected encoder failure"));
        }
        log.frames.push(RecordedFrame {
            timestamp_us,
            key,
            data: frame.data.clone(),
        });
        Ok(())
    }

    fn push_audio(&mut self, chunk: &AudioChunk) -> CliplaneResult<()> {
        self.log.lock().audio.push(chunk.clone());
        Ok(())
    }

    fn finish(&mut self) -> CliplaneResult<Vec<u8>> {
        let mut log = self.log.lock();
        log.finished = true;
        Ok(log.frames.iter().flat_map(|f| f.data.iter().copied()).collect())
    }

    fn abort(&mut self) {
        self.log.lock().aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
