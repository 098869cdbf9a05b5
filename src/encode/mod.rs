//! Export pipeline: frame loop, audio bed, isolated worker and encoding sinks.
//!
//! Sinks consume composited frames in strictly increasing timestamp order plus audio chunks in
//! arrival order, and hand back the finished container bytes.

/// Audio bed and the producer thread that streams it.
pub mod audio;
/// Export options and the frame-by-frame export job.
pub mod export;
/// `ffmpeg`-based sink (MP4/WebM via system `ffmpeg`).
pub mod ffmpeg;
/// Sink trait and the in-memory sink.
pub mod sink;
/// Isolated compositing/encoding thread.
pub mod worker;
