use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::media::{MediaInfo, MediaSource, Playhead};
use crate::render::surface::Surface;

/// Sample rate used for every decoded audio bed.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Video stream geometry and container length reported by `ffprobe`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoProbe {
    pub width: u32,
    pub height: u32,
    pub duration_ms: f64,
}

/// Video file decoded through the system `ffprobe`/`ffmpeg` binaries.
///
/// Frames are decoded on demand at the current position; the last decoded frame is reused while
/// the position stays on the same millisecond.
pub struct FfmpegVideoSource {
    path: PathBuf,
    uri: String,
    probe: VideoProbe,
    playhead: Playhead,
    cached: Option<(i64, Arc<Surface>)>,
}

impl std::fmt::Debug for FfmpegVideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegVideoSource")
            .field("path", &self.path)
            .field("probe", &self.probe)
            .field("position_ms", &self.playhead.position_ms())
            .finish()
    }
}

impl FfmpegVideoSource {
    /// Probe `path`; fails with [`CliplaneError::Load`] when the file cannot be decoded.
    pub fn open(path: &Path) -> CliplaneResult<Self> {
        let probe = probe_video(path)?;
        tracing::debug!(
            path = %path.display(),
            width = probe.width,
            height = probe.height,
            duration_ms = probe.duration_ms,
            "probed video source"
        );
        Ok(Self {
            path: path.to_path_buf(),
            uri: path.display().to_string(),
            playhead: Playhead::new(probe.duration_ms),
            probe,
            cached: None,
        })
    }

    pub fn probe(&self) -> &VideoProbe {
        &self.probe
    }
}

impl MediaSource for FfmpegVideoSource {
    fn info(&self) -> MediaInfo {
        MediaInfo {
            width: self.probe.width,
            height: self.probe.height,
            duration_ms: self.probe.duration_ms,
        }
    }

    fn uri(&self) -> Option<&str> {
        Some(&self.uri)
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
        let pos = self.playhead.position_ms();
        let at_ms = pos.round() as i64;
        if let Some((cached_at, frame)) = &self.cached
            && *cached_at == at_ms
        {
            return Ok(Arc::clone(frame));
        }

        // The last frame sits slightly before the container end.
        let last_ms = (self.probe.duration_ms - 1.0).max(0.0);
        let rgba = decode_frame(&self.path, self.probe, pos.min(last_ms))?;
        let frame = Arc::new(Surface::from_straight(
            self.probe.width,
            self.probe.height,
            rgba,
        )?);
        self.cached = Some((at_ms, Arc::clone(&frame)));
        Ok(frame)
    }
}

/// What a finished `ffmpeg`/`ffprobe` invocation left behind.
#[derive(Debug)]
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
struct ToolRun {
    ok: bool,
    stdout: Vec<u8>,
    stderr: String,
}

impl ToolRun {
    /// `stdout` of a successful run, or a load error naming `what` failed for `path`.
    fn into_stdout(self, what: &str, path: &Path) -> CliplaneResult<Vec<u8>> {
        if !self.ok {
            return Err(CliplaneError::load(format!(
                "{what} failed for '{}': {}",
                path.display(),
                self.stderr
            )));
        }
        Ok(self.stdout)
    }
}

#[cfg(feature = "media-ffmpeg")]
fn run_tool(cmd: &mut Command) -> CliplaneResult<ToolRun> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let out = cmd
        .stdin(std::process::Stdio::null())
        .output()
        .map_err(|e| CliplaneError::load(format!("failed to run {program}: {e}")))?;
    Ok(ToolRun {
        ok: out.status.success(),
        stdout: out.stdout,
        stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
fn run_tool(cmd: &mut Command) -> CliplaneResult<ToolRun> {
    Err(CliplaneError::load(format!(
        "decoding through {} requires the 'media-ffmpeg' feature",
        cmd.get_program().to_string_lossy()
    )))
}

/// Probe the first video stream and the container duration of `path` through `ffprobe`.
pub fn probe_video(path: &Path) -> CliplaneResult<VideoProbe> {
    let json = run_tool(
        Command::new("ffprobe")
            .args(["-v", "error", "-of", "json", "-show_streams", "-show_format"])
            .arg(path),
    )?
    .into_stdout("ffprobe", path)?;
    parse_probe(&json).map_err(|e| match e {
        CliplaneError::Load(msg) => CliplaneError::load(format!("'{}': {msg}", path.display())),
        other => other,
    })
}

/// Read `ffprobe -of json` output into a [`VideoProbe`].
fn parse_probe(json: &[u8]) -> CliplaneResult<VideoProbe> {
    #[derive(serde::Deserialize)]
    struct Stream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct Format {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct Report {
        #[serde(default)]
        streams: Vec<Stream>,
        format: Option<Format>,
    }

    let report: Report = serde_json::from_slice(json)
        .map_err(|e| CliplaneError::load(format!("unreadable ffprobe report: {e}")))?;
    let (width, height) = report
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("video"))
        .find_map(|s| Some((s.width?, s.height?)))
        .filter(|&(w, h)| w > 0 && h > 0)
        .ok_or_else(|| CliplaneError::load("no decodable video stream"))?;
    let duration_ms = report
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d * 1000.0)
        .ok_or_else(|| CliplaneError::load("container reports no duration"))?;
    Ok(VideoProbe {
        width,
        height,
        duration_ms,
    })
}

/// Decode one straight-alpha RGBA8 frame of `path` at `at_ms`.
fn decode_frame(path: &Path, probe: VideoProbe, at_ms: f64) -> CliplaneResult<Vec<u8>> {
    let stdout = run_tool(
        Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{:.3}", at_ms / 1000.0), "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"]),
    )?
    .into_stdout("ffmpeg frame decode", path)?;
    frame_bytes(stdout, probe.width, probe.height)
}

/// Trim decoder output to exactly one `width x height` RGBA8 frame.
fn frame_bytes(mut raw: Vec<u8>, width: u32, height: u32) -> CliplaneResult<Vec<u8>> {
    let len = width as usize * height as usize * 4;
    if raw.len() < len {
        return Err(CliplaneError::load(format!(
            "decoded frame is {} bytes, expected {len}",
            raw.len()
        )));
    }
    raw.truncate(len);
    Ok(raw)
}

/// Decode the audio of a media file to interleaved stereo `f32` PCM at `sample_rate`.
///
/// A file without an audio stream decodes to empty PCM.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> CliplaneResult<Vec<f32>> {
    let run = run_tool(
        Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-vn", "-ac", "2", "-ar", &sample_rate.to_string()])
            .args(["-c:a", "pcm_f32le", "-f", "f32le", "pipe:1"]),
    )?;
    if !run.ok && lacks_audio_stream(&run.stderr) {
        return Ok(Vec::new());
    }
    pcm_f32le(&run.into_stdout("ffmpeg audio decode", path)?)
}

/// `true` when ffmpeg refused to decode because the input has no audio stream.
fn lacks_audio_stream(stderr: &str) -> bool {
    stderr.contains("matches no streams") || stderr.contains("does not contain any stream")
}

fn pcm_f32le(bytes: &[u8]) -> CliplaneResult<Vec<f32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(CliplaneError::load(
            "decoded audio ends in a partial f32 sample",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|s| f32::from_le_bytes([s[0], s[1], s[2], s[3]]))
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
