use std::fs::File;
use std::io::{BufWriter, Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::audio::AudioChunk;
use crate::encode::export::{ExportFormat, key_frame_timestamps_us};
use crate::encode::sink::{MediaSink, SinkConfig};
use crate::foundation::core::Fps;
use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::surface::Surface;

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Container/codec pair: H.264+AAC in MP4 or VP9+Opus in WebM.
    pub profile: ExportFormat,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
    /// `ffmpeg` executable.
    pub ffmpeg_bin: PathBuf,
}

impl FfmpegSinkOpts {
    pub fn new(profile: ExportFormat) -> Self {
        Self {
            profile,
            bg_rgba: [0, 0, 0, 255],
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to stdin.
///
/// Video is encoded while frames arrive. Audio chunks are spooled to a raw `f32le` file and muxed
/// with the video once `finish` is called; the finished container is read back into memory.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    work_dir: Option<PathBuf>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    audio_spool: Option<BufWriter<File>>,
    /// Frames written to the spool so far.
    audio_frames: u64,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_ts: Option<i64>,
    /// Timestamps handed to `-force_key_frames`, ascending.
    key_times_us: Vec<i64>,
}

impl std::fmt::Debug for FfmpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSink")
            .field("opts", &self.opts)
            .field("work_dir", &self.work_dir)
            .field("running", &self.child.is_some())
            .finish()
    }
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            work_dir: None,
            child: None,
            stdin: None,
            stderr_drain: None,
            audio_spool: None,
            audio_frames: 0,
            scratch: Vec::new(),
            cfg: None,
            last_ts: None,
            key_times_us: Vec::new(),
        }
    }

    fn video_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("video.{}", self.opts.profile.extension()))
    }

    fn wait_encoder(&mut self) -> CliplaneResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| CliplaneError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            CliplaneError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CliplaneError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| CliplaneError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(CliplaneError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn mux_audio(&self, dir: &Path, video: &Path, cfg: &SinkConfig) -> CliplaneResult<PathBuf> {
        let Some(audio) = cfg.audio else {
            return Ok(video.to_path_buf());
        };
        let out = dir.join(format!("animation.{}", self.opts.profile.extension()));
        let audio_codec = match self.opts.profile {
            ExportFormat::Mp4 => "aac",
            ExportFormat::Webm => "libopus",
        };

        let output = Command::new(&self.opts.ffmpeg_bin)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(video)
            .args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(dir.join("audio.f32le"))
            .args(["-c:v", "copy", "-c:a", audio_codec, "-shortest"])
            .arg(&out)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CliplaneError::encode(format!("failed to spawn ffmpeg for mux: {e}")))?;
        if !output.status.success() {
            return Err(CliplaneError::encode(format!(
                "ffmpeg mux exited with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(out)
    }

    fn cleanup(&mut self) {
        self.audio_spool = None;
        self.cfg = None;
        self.key_times_us.clear();
        if let Some(dir) = self.work_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&dir)
        {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove ffmpeg work dir");
        }
    }
}

impl MediaSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> CliplaneResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(CliplaneError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(CliplaneError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(CliplaneError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        if let Some(audio) = cfg.audio
            && (audio.sample_rate == 0 || audio.channels == 0)
        {
            return Err(CliplaneError::validation(
                "audio sample_rate/channels must be non-zero when audio is enabled",
            ));
        }
        if !ffmpeg_runs(&self.opts.ffmpeg_bin) {
            return Err(CliplaneError::encode(format!(
                "ffmpeg is required for encoding, but '{}' could not be run",
                self.opts.ffmpeg_bin.display()
            )));
        }

        let dir = std::env::temp_dir().join(format!("cliplane-{}", uuid::Uuid::new_v4()));
        ensure_parent_dir(&dir.join("x"))?;
        let video_path = self.video_path(&dir);
        self.work_dir = Some(dir.clone());

        let mut cmd = Command::new(&self.opts.ffmpeg_bin);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Input: raw RGBA8 frames. `ffmpeg` does not understand premul, so we flatten alpha
        // before writing to stdin (push_video).
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an"]);
        match self.opts.profile {
            ExportFormat::Mp4 => cmd.args([
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ]),
            ExportFormat::Webm => cmd.args(["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p", "-b:v", "1M"]),
        };
        // Raw stdin frames carry no key flag, so the planned key times go on the command line.
        let key_times_us = key_frame_timestamps_us(cfg.fps, cfg.frames);
        if !key_times_us.is_empty() {
            cmd.arg("-force_key_frames").arg(key_time_list(&key_times_us));
        }
        cmd.arg(&video_path);

        let mut child = cmd.spawn().map_err(|e| {
            CliplaneError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CliplaneError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CliplaneError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        if cfg.audio.is_some() {
            let spool = File::create(dir.join("audio.f32le"))
                .map_err(|e| CliplaneError::encode(format!("failed to create audio spool: {e}")))?;
            self.audio_spool = Some(BufWriter::new(spool));
        }

        self.scratch = vec![0u8; (cfg.width * cfg.height * 4) as usize];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.audio_frames = 0;
        self.cfg = Some(cfg);
        self.last_ts = None;
        tracing::debug!(
            profile = ?self.opts.profile,
            width = cfg.width,
            height = cfg.height,
            key_frames = key_times_us.len(),
            "ffmpeg encoder started"
        );
        self.key_times_us = key_times_us;
        Ok(())
    }

    fn push_video(&mut self, frame: &Surface, timestamp_us: i64, key: bool) -> CliplaneResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| CliplaneError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_ts
            && timestamp_us <= last
        {
            return Err(CliplaneError::encode(
                "ffmpeg sink received out-of-order frame timestamp",
            ));
        }
        if self.key_times_us.binary_search(&timestamp_us).is_ok() != key {
            return Err(CliplaneError::encode(format!(
                "key flag {key} at {timestamp_us}us does not match the key frames passed to ffmpeg"
            )));
        }
        self.last_ts = Some(timestamp_us);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(CliplaneError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(CliplaneError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        // Flatten premultiplied RGBA8 over the configured background.
        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(CliplaneError::encode("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            CliplaneError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn push_audio(&mut self, chunk: &AudioChunk) -> CliplaneResult<()> {
        let Some(cfg) = self.cfg.as_ref() else {
            return Err(CliplaneError::encode("ffmpeg sink not started"));
        };
        let Some(spec) = cfg.audio else {
            return Err(CliplaneError::encode(
                "audio chunk pushed to a sink configured without audio",
            ));
        };
        if chunk.sample_rate != spec.sample_rate || chunk.channels != spec.channels {
            return Err(CliplaneError::encode("audio chunk layout does not match sink config"));
        }
        let Some(spool) = self.audio_spool.as_mut() else {
            return Err(CliplaneError::encode("ffmpeg sink is already finalized"));
        };

        // Place the chunk at its timestamp: pad gaps with silence, drop overlap.
        let channels = usize::from(spec.channels);
        let at = chunk.timestamp_us.max(0) as u64 * u64::from(spec.sample_rate) / 1_000_000;
        let mut samples: &[f32] = &chunk.samples;
        if at > self.audio_frames {
            let gap = (at - self.audio_frames) as usize * channels;
            for _ in 0..gap {
                spool.write_all(&0f32.to_le_bytes()).map_err(spool_err)?;
            }
            self.audio_frames = at;
        } else if at < self.audio_frames {
            let skip = ((self.audio_frames - at) as usize * channels).min(samples.len());
            samples = &samples[skip..];
        }
        for s in samples {
            spool.write_all(&s.to_le_bytes()).map_err(spool_err)?;
        }
        self.audio_frames += (samples.len() / channels) as u64;
        Ok(())
    }

    fn finish(&mut self) -> CliplaneResult<Vec<u8>> {
        let result = (|| {
            let cfg = self
                .cfg
                .ok_or_else(|| CliplaneError::encode("ffmpeg sink not started"))?;
            let dir = self
                .work_dir
                .clone()
                .ok_or_else(|| CliplaneError::encode("ffmpeg sink not started"))?;
            if let Some(mut spool) = self.audio_spool.take() {
                spool.flush().map_err(spool_err)?;
            }
            self.wait_encoder()?;

            let video = self.video_path(&dir);
            let out = self.mux_audio(&dir, &video, &cfg)?;
            std::fs::read(&out).map_err(|e| {
                CliplaneError::encode(format!("failed to read '{}': {e}", out.display()))
            })
        })();
        self.cleanup();
        result
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        self.cleanup();
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() || self.work_dir.is_some() {
            self.abort();
        }
    }
}

fn spool_err(e: std::io::Error) -> CliplaneError {
    CliplaneError::encode(format!("failed to write audio spool: {e}"))
}

/// `-force_key_frames` value: comma-separated times in seconds.
fn key_time_list(times_us: &[i64]) -> String {
    let secs: Vec<String> = times_us
        .iter()
        .map(|us| format!("{}.{:06}", us / 1_000_000, us % 1_000_000))
        .collect();
    secs.join(",")
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate, as `num/den`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

pub(crate) fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> CliplaneResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(CliplaneError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        let r = s[0] as u16 + mul_div255_u16(bg_r, inv);
        let g = s[1] as u16 + mul_div255_u16(bg_g, inv);
        let b = s[2] as u16 + mul_div255_u16(bg_b, inv);

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> CliplaneResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    ffmpeg_runs(Path::new("ffmpeg"))
}

/// Return `true` when `bin -version` runs and exits successfully.
pub(crate) fn ffmpeg_runs(bin: &Path) -> bool {
    Command::new(bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
