use std::str::FromStr;

use crate::encode::audio::{AudioBed, AudioChunk, AudioPacing, AudioPump};
use crate::encode::sink::{MediaSink, SinkConfig};
use crate::encode::worker::ExportWorker;
use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, Rgba8Premul};
use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::render::draw::{ClipDraw, composite};
use crate::render::surface::Surface;
use crate::timeline::Track;

/// A key frame is forced when more than this much timeline time passed since the last one.
pub const KEY_FRAME_INTERVAL_MS: f64 = 2000.0;

/// Tracks the last key frame of an export and decides whether the next frame is one.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct KeyClock {
    last_key_ms: Option<f64>,
}

impl KeyClock {
    /// `true` for the first frame and whenever more than [`KEY_FRAME_INTERVAL_MS`] elapsed.
    pub(crate) fn is_key(&mut self, frame_ms: f64) -> bool {
        let key = self.keys.is_key(frame_ms);
        key
    }
}

/// Timestamps, in microseconds, of the frames an export of `frames` frames at `fps` marks as key.
pub fn key_frame_timestamps_us(fps: Fps, frames: u64) -> Vec<i64> {
    let mut clock = KeyClock::default();
    (0..frames)
        .map(FrameIndex)
        .filter(|&f| clock.is_key(fps.frame_time_ms(f)))
        .map(|f| fps.frame_timestamp_us(f))
        .collect()
}

/// Output container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExportFormat {
    /// H.264 video, AAC audio.
    #[default]
    #[serde(rename = "MP4")]
    Mp4,
    /// VP9 video, Opus audio.
    #[serde(rename = "WEBM")]
    Webm,
}

impl ExportFormat {
    /// Parse `"MP4"` or `"WEBM"` (any case).
    pub fn parse(s: &str) -> CliplaneResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MP4" => Ok(Self::Mp4),
            "WEBM" => Ok(Self::Webm),
            _ => Err(CliplaneError::validation(format!(
                "unknown export format '{s}' (expected MP4 or WEBM)"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mp4 => "MP4",
            Self::Webm => "WEBM",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }

    /// File name of the finished artifact, `animation.<ext>`.
    pub fn artifact_name(self) -> String {
        format!("animation.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CliplaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where export frames are composited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportStrategy {
    /// On the caller's thread, into an offscreen surface.
    #[default]
    MainThread,
    /// On a dedicated worker thread that also owns the sink.
    IsolatedWorker,
}

/// Options for [`crate::Compositor::export`].
#[derive(Clone, Debug, Default)]
pub struct ExportOpts {
    /// Overrides the compositor's selected format when set.
    pub format: Option<ExportFormat>,
    pub strategy: ExportStrategy,
    /// Backing audio, muxed alongside the video.
    pub audio: Option<AudioBed>,
    pub audio_pacing: AudioPacing,
}

/// A finished export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    /// `animation.mp4` or `animation.webm`.
    pub file_name: String,
    pub format: ExportFormat,
    /// Container bytes as returned by the sink.
    pub bytes: Vec<u8>,
    /// Number of video frames encoded.
    pub frames: u64,
}

/// Everything an export needs from the compositor at start.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ExportPlan {
    pub(crate) format: ExportFormat,
    pub(crate) canvas: Canvas,
    pub(crate) fps: Fps,
    pub(crate) background: Rgba8Premul,
    pub(crate) start_ms: f64,
    pub(crate) end_ms: f64,
}

enum Driver {
    MainThread {
        sink: Box<dyn MediaSink>,
        canvas: Surface,
        background: Rgba8Premul,
    },
    Worker(ExportWorker),
}

impl Driver {
    fn push_audio(&mut self, chunks: Vec<AudioChunk>) -> CliplaneResult<()> {
        for chunk in chunks {
            match self {
                Driver::MainThread { sink, .. } => sink.push_audio(&chunk)?,
                Driver::Worker(worker) => worker.push_audio(chunk)?,
            }
        }
        Ok(())
    }

    fn push_frame(
        &mut self,
        index: FrameIndex,
        timestamp_us: i64,
        key: bool,
        draws: Vec<ClipDraw>,
    ) -> CliplaneResult<()> {
        match self {
            Driver::MainThread {
                sink,
                canvas,
                background,
            } => {
                composite(canvas, *background, Affine::IDENTITY, &draws)?;
                sink.push_video(canvas, timestamp_us, key)
            }
            Driver::Worker(worker) => worker.print_frame(index, timestamp_us, key, draws),
        }
    }

    fn finish(self) -> CliplaneResult<Vec<u8>> {
        match self {
            Driver::MainThread { mut sink, .. } => sink.finish(),
            Driver::Worker(worker) => worker.finish(),
        }
    }

    fn abort(self) {
        match self {
            Driver::MainThread { mut sink, .. } => sink.abort(),
            Driver::Worker(worker) => worker.abort(),
        }
    }
}

/// Frame-by-frame export of a time range.
///
/// Each [`ExportJob::step`] composites and encodes one frame; the job owns the sink (directly or
/// through the worker) and the audio pump until it finishes or is aborted.
pub(crate) struct ExportJob {
    driver: Option<Driver>,
    pump: Option<AudioPump>,
    pacing: AudioPacing,
    plan: ExportPlan,
    total_frames: u64,
    next: u64,
    keys: KeyClock,
}

impl std::fmt::Debug for ExportJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportJob")
            .field("plan", &self.plan)
            .field("total_frames", &self.total_frames)
            .field("next", &self.next)
            .finish()
    }
}

impl ExportJob {
    /// Start the sink (and worker / audio pump) for `plan`.
    #[tracing::instrument(skip(opts, sink), fields(format = %plan.format, strategy = ?opts.strategy))]
    pub(crate) fn start(
        plan: ExportPlan,
        opts: &ExportOpts,
        sink: Box<dyn MediaSink>,
    ) -> CliplaneResult<Self> {
        plan.canvas.validate()?;
        let duration_ms = plan.end_ms - plan.start_ms;
        let total_frames = plan.fps.frames_for_duration_ms(duration_ms);
        let cfg = SinkConfig {
            width: plan.canvas.width,
            height: plan.canvas.height,
            fps: plan.fps,
            frames: total_frames,
            audio: opts.audio.as_ref().map(AudioBed::spec),
        };

        let driver = match opts.strategy {
            ExportStrategy::MainThread => {
                let mut sink = sink;
                sink.begin(cfg)?;
                Driver::MainThread {
                    sink,
                    canvas: Surface::new(cfg.width, cfg.height),
                    background: plan.background,
                }
            }
            ExportStrategy::IsolatedWorker => {
                let worker = ExportWorker::spawn(sink)?;
                worker.begin(cfg, plan.background)?;
                Driver::Worker(worker)
            }
        };

        let pump = match &opts.audio {
            Some(bed) => match AudioPump::start(bed.clone(), duration_ms, opts.audio_pacing) {
                Ok(pump) => Some(pump),
                Err(e) => {
                    driver.abort();
                    return Err(e);
                }
            },
            None => None,
        };

        tracing::debug!(total_frames, duration_ms, "export started");
        Ok(Self {
            driver: Some(driver),
            pump,
            pacing: opts.audio_pacing,
            plan,
            total_frames,
            next: 0,
            keys: KeyClock::default(),
        })
    }

    pub(crate) fn format(&self) -> ExportFormat {
        self.plan.format
    }

    pub(crate) fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub(crate) fn frames_done(&self) -> u64 {
        self.next
    }

    fn driver(&mut self) -> CliplaneResult<&mut Driver> {
        self.driver
            .as_mut()
            .ok_or_else(|| CliplaneError::encode("export already finished"))
    }

    /// Encode the next frame of `tracks`. Returns the container bytes once the last frame is done.
    ///
    /// On error the caller is expected to [`ExportJob::abort`].
    pub(crate) fn step(&mut self, tracks: &mut [Track]) -> CliplaneResult<Option<Vec<u8>>> {
        if self.next >= self.total_frames {
            return self.finish().map(Some);
        }

        let index = FrameIndex(self.next);
        let frame_ms = self.plan.fps.frame_time_ms(index);
        let timestamp_us = self.plan.fps.frame_timestamp_us(index);
        let key = self.keys.is_key(frame_ms);

        let draws = collect_draws(tracks, self.plan.start_ms + frame_ms)?;
        let audio = self.pump.as_ref().map(AudioPump::drain).unwrap_or_default();
        let driver = self.driver()?;
        driver.push_audio(audio)?;
        driver.push_frame(index, timestamp_us, key, draws)?;
        self.next += 1;

        if self.next >= self.total_frames {
            return self.finish().map(Some);
        }
        Ok(None)
    }

    fn finish(&mut self) -> CliplaneResult<Vec<u8>> {
        let rest = match self.pump.take() {
            Some(pump) if self.pacing == AudioPacing::Realtime => pump.stop(),
            Some(pump) => pump.finish(),
            None => Vec::new(),
        };
        let mut driver = self
            .driver
            .take()
            .ok_or_else(|| CliplaneError::encode("export already finished"))?;
        if let Err(e) = driver.push_audio(rest) {
            driver.abort();
            return Err(e);
        }
        let bytes = driver.finish()?;
        tracing::debug!(frames = self.next, bytes = bytes.len(), "export finished");
        Ok(bytes)
    }

    /// Drop the sink output and stop the audio pump.
    pub(crate) fn abort(mut self) {
        if let Some(pump) = self.pump.take() {
            drop(pump.stop());
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

/// Sync every visible track to `time_ms` and collect draws bottom-to-top.
///
/// Later tracks are drawn first, so the first track ends up on top.
pub(crate) fn collect_draws(tracks: &mut [Track], time_ms: f64) -> CliplaneResult<Vec<ClipDraw>> {
    let mut draws = Vec::new();
    for track in tracks.iter_mut().rev().filter(|t| t.is_visible()) {
        draws.extend(track.try_prepare_frame(time_ms)?);
    }
    Ok(draws)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/export.rs"]
mod tests;
