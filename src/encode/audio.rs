use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};

use crate::encode::sink::AudioSpec;
use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::media::ffmpeg::{AUDIO_SAMPLE_RATE, decode_audio_f32_stereo};

/// Frames (per channel) in one streamed chunk.
pub const AUDIO_CHUNK_FRAMES: usize = 1024;

/// Channel buffer size in chunks (~5s at 48 kHz).
const AUDIO_CHANNEL_CHUNKS: usize = 256;

const BED_CHANNELS: u16 = 2;

/// Backing audio for an export: interleaved stereo `f32` PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBed {
    sample_rate: u32,
    samples: Arc<Vec<f32>>,
}

impl AudioBed {
    /// Wrap interleaved stereo samples.
    pub fn from_samples(sample_rate: u32, samples: Vec<f32>) -> CliplaneResult<Self> {
        if sample_rate == 0 {
            return Err(CliplaneError::validation("audio sample_rate must be > 0"));
        }
        if !samples.len().is_multiple_of(usize::from(BED_CHANNELS)) {
            return Err(CliplaneError::validation(
                "stereo audio must have an even number of interleaved samples",
            ));
        }
        Ok(Self {
            sample_rate,
            samples: Arc::new(samples),
        })
    }

    /// Decode a media file once at 48 kHz stereo.
    pub fn decode(path: &Path) -> CliplaneResult<Self> {
        let samples = decode_audio_f32_stereo(path, AUDIO_SAMPLE_RATE)?;
        tracing::debug!(
            path = %path.display(),
            frames = samples.len() / 2,
            "decoded audio bed"
        );
        Self::from_samples(AUDIO_SAMPLE_RATE, samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        BED_CHANNELS
    }

    pub fn spec(&self) -> AudioSpec {
        AudioSpec {
            sample_rate: self.sample_rate,
            channels: BED_CHANNELS,
        }
    }

    /// Length in frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(BED_CHANNELS)
    }

    pub fn duration_ms(&self) -> f64 {
        self.frames() as f64 * 1000.0 / f64::from(self.sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// A slice of the bed as delivered to a sink.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioChunk {
    /// Position of the first frame, derived from the sample count.
    pub timestamp_us: i64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples.
    pub samples: Vec<f32>,
}

impl AudioChunk {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }
}

/// How fast the [`AudioPump`] releases chunks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AudioPacing {
    /// As fast as the consumer takes them.
    #[default]
    Unpaced,
    /// No earlier than their timestamp, measured from the pump start.
    Realtime,
}

/// Producer thread streaming an [`AudioBed`] in [`AUDIO_CHUNK_FRAMES`]-frame chunks.
///
/// Chunks never extend past the requested duration.
pub struct AudioPump {
    rx: Receiver<AudioChunk>,
    should_stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for AudioPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPump")
            .field("queued", &self.rx.len())
            .field("stopping", &self.should_stop.load(Ordering::Relaxed))
            .finish()
    }
}

impl AudioPump {
    pub fn start(bed: AudioBed, duration_ms: f64, pacing: AudioPacing) -> CliplaneResult<Self> {
        let (tx, rx) = bounded(AUDIO_CHANNEL_CHUNKS);
        let should_stop = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&should_stop);

        let handle = std::thread::Builder::new()
            .name("cliplane-audio".to_owned())
            .spawn(move || produce(&bed, duration_ms, pacing, &tx, &stop))
            .map_err(|e| CliplaneError::encode(format!("failed to spawn audio thread: {e}")))?;

        Ok(Self {
            rx,
            should_stop,
            handle: Some(handle),
        })
    }

    /// Chunks available right now, without blocking.
    pub fn drain(&self) -> Vec<AudioChunk> {
        self.rx.try_iter().collect()
    }

    /// Wait for the producer to reach the end and return the remaining chunks.
    pub fn finish(mut self) -> Vec<AudioChunk> {
        let rest: Vec<AudioChunk> = self.rx.iter().collect();
        self.join();
        rest
    }

    /// Stop producing now and return whatever was already queued.
    pub fn stop(mut self) -> Vec<AudioChunk> {
        self.should_stop.store(true, Ordering::Relaxed);
        let rest: Vec<AudioChunk> = self.rx.iter().collect();
        self.join();
        rest
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("audio thread panicked");
        }
    }
}

impl Drop for AudioPump {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::Relaxed);
        // Unblock a producer waiting on a full channel.
        while self.rx.try_recv().is_ok() {}
        self.join();
    }
}

fn produce(
    bed: &AudioBed,
    duration_ms: f64,
    pacing: AudioPacing,
    tx: &Sender<AudioChunk>,
    stop: &AtomicBool,
) {
    let rate = u64::from(bed.sample_rate());
    let channels = usize::from(bed.channels());
    let limit = if duration_ms.is_finite() && duration_ms > 0.0 {
        ((duration_ms * rate as f64 / 1000.0).round() as usize).min(bed.frames())
    } else {
        0
    };

    let started = Instant::now();
    let mut offset = 0usize;
    while offset < limit && !stop.load(Ordering::Relaxed) {
        let end = (offset + AUDIO_CHUNK_FRAMES).min(limit);
        let timestamp_us = (offset as u64 * 1_000_000 / rate) as i64;

        if pacing == AudioPacing::Realtime {
            let due = started + Duration::from_micros(timestamp_us as u64);
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            }
        }

        let mut chunk = AudioChunk {
            timestamp_us,
            sample_rate: bed.sample_rate(),
            channels: bed.channels(),
            samples: bed.samples()[offset * channels..end * channels].to_vec(),
        };
        loop {
            match tx.send_timeout(chunk, Duration::from_millis(20)) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(back)) => {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    chunk = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
        offset = end;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/audio.rs"]
mod tests;
