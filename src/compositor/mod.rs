//! The compositor: tracks, clock, transport state machine, live preview and export.
//!
//! Everything here is driven from one thread. Callers either [`Compositor::pump`] it from their
//! own loop (interactive use) or call [`Compositor::render_at`] / [`Compositor::export`] directly.

use std::time::{Duration, Instant};

use crate::clock::{Clock, DEFAULT_TICK_MS, Interval};
use crate::encode::export::{ExportArtifact, ExportFormat, ExportJob, ExportOpts, ExportPlan};
use crate::encode::sink::MediaSink;
use crate::foundation::core::{Canvas, Color, Fps};
use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::foundation::event::{Emitter, EventName};
use crate::render::draw::{composite, view_transform};
use crate::render::surface::Surface;
use crate::timeline::{Mutation, Track};

/// Project documents and their reconstruction.
pub mod project;

/// Distance in pixels under which [`Compositor::snap_axis`] snaps to an edge.
pub const SNAP_THRESHOLD_PX: f64 = 10.0;

/// Construction options for a [`Compositor`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorOpts {
    pub width: u32,
    pub height: u32,
    /// Render cadence and export frame rate.
    pub fps: Fps,
    pub background: Color,
    /// Period of the clock's virtual ticks.
    pub tick_interval_ms: u64,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            width: 720,
            height: 420,
            fps: Fps { num: 60, den: 1 },
            background: Color::hsla(104.0, 0.44, 0.24, 1.0),
            tick_interval_ms: DEFAULT_TICK_MS,
        }
    }
}

/// Transport state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    /// An export owns the timeline; geometry and transport controls are frozen.
    Recording,
}

/// Change notifications of the [`Compositor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositorEvent {
    StateChanged,
    /// A preview frame was drawn. Fires at the render cadence.
    FrameDrawn,
    ScaleChanged,
    OffsetXChanged,
    OffsetYChanged,
    ClipSelected,
    DurationChanged,
    TracksChanged,
    TrackSelected,
    LoopChanged,
    FormatChanged,
    /// Playback reached the end limit.
    Ending,
    LimitsChanged,
    ExportFinished,
}

impl EventName for CompositorEvent {
    const ALL: &'static [Self] = &[
        Self::StateChanged,
        Self::FrameDrawn,
        Self::ScaleChanged,
        Self::OffsetXChanged,
        Self::OffsetYChanged,
        Self::ClipSelected,
        Self::DurationChanged,
        Self::TracksChanged,
        Self::TrackSelected,
        Self::LoopChanged,
        Self::FormatChanged,
        Self::Ending,
        Self::LimitsChanged,
        Self::ExportFinished,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::StateChanged => "CHANGE_STATE",
            Self::FrameDrawn => "HOT_PLAYING",
            Self::ScaleChanged => "CHANGE_SCALE",
            Self::OffsetXChanged => "CHANGE_OFFSETX",
            Self::OffsetYChanged => "CHANGE_OFFSETY",
            Self::ClipSelected => "CHANGE_SELECT",
            Self::DurationChanged => "CHANGE_DURATION",
            Self::TracksChanged => "CHANGE_TIMELINES",
            Self::TrackSelected => "CHANGE_SELECT_TIMELINE",
            Self::LoopChanged => "CHANGE_MODE_LOOP",
            Self::FormatChanged => "CHANGE_FORMAT",
            Self::Ending => "ENDING",
            Self::LimitsChanged => "CHANGE_LIMITS",
            Self::ExportFinished => "EXPORT_DONE",
        }
    }
}

/// Where an output rectangle should snap to, per axis.
///
/// `x`/`y` are the snapped origin coordinates. `offset_x`/`offset_y` are the width/height when the
/// far edge (rather than the origin) produced the snap, which is where a guide line should be drawn
/// relative to the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisSnap {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Owner of all tracks, the clock and the transport.
pub struct Compositor {
    opts: CompositorOpts,
    clock: Clock,
    tick_timer: Interval,
    render_timer: Interval,

    tracks: Vec<Track>,
    selected_track: Option<String>,
    selected_clip: Option<String>,

    scale: f64,
    offset_x: f64,
    offset_y: f64,

    state: TransportState,
    looping: bool,
    format: ExportFormat,
    time_start_ms: u64,
    time_end_ms: Option<u64>,
    duration_ms: f64,

    surface: Surface,
    export: Option<ExportJob>,
    artifact: Option<ExportArtifact>,
    events: Emitter<CompositorEvent>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("opts", &self.opts)
            .field("tracks", &self.tracks.len())
            .field("state", &self.state)
            .field("elapsed_ms", &self.clock.elapsed())
            .field("duration_ms", &self.duration_ms)
            .field("export", &self.export)
            .finish()
    }
}

impl Compositor {
    /// A stopped compositor at time 0 with one empty track.
    pub fn new(opts: CompositorOpts) -> CliplaneResult<Self> {
        Canvas {
            width: opts.width,
            height: opts.height,
        }
        .validate()?;
        Fps::new(opts.fps.num, opts.fps.den)?;

        let frame_period = Duration::from_secs_f64(opts.fps.frame_duration_ms() / 1000.0);
        Ok(Self {
            opts,
            clock: Clock::new(opts.tick_interval_ms),
            tick_timer: Interval::new(Duration::from_millis(opts.tick_interval_ms.max(1))),
            render_timer: Interval::new(frame_period),
            tracks: vec![Track::new()],
            selected_track: None,
            selected_clip: None,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            state: TransportState::Stopped,
            looping: false,
            format: ExportFormat::Mp4,
            time_start_ms: 0,
            time_end_ms: None,
            duration_ms: 0.0,
            surface: Surface::new(opts.width, opts.height),
            export: None,
            artifact: None,
            events: Emitter::new(),
        })
    }

    pub fn opts(&self) -> &CompositorOpts {
        &self.opts
    }

    pub fn events(&self) -> &Emitter<CompositorEvent> {
        &self.events
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == TransportState::Recording
    }

    /// Current playhead in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed()
    }

    /// The live preview surface, as last drawn.
    pub fn frame(&self) -> &Surface {
        &self.surface
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "transport");
            self.state = state;
            self.events.emit(CompositorEvent::StateChanged);
        }
    }

    // Transport

    /// Start playback. Only valid from `Stopped`.
    pub fn play(&mut self) -> Mutation {
        if self.state != TransportState::Stopped {
            return Mutation::Rejected;
        }
        self.clock.play();
        self.set_state(TransportState::Playing);
        Mutation::Applied
    }

    /// Pause playback. Only valid from `Playing`.
    pub fn pause(&mut self) -> Mutation {
        if self.state != TransportState::Playing {
            return Mutation::Rejected;
        }
        self.clock.pause();
        self.set_state(TransportState::Stopped);
        Mutation::Applied
    }

    /// Move the playhead. Ignored while recording.
    pub fn seek(&mut self, ms: u64) -> Mutation {
        if self.is_recording() {
            return Mutation::Rejected;
        }
        if self.clock.elapsed() == ms {
            return Mutation::Unchanged;
        }
        self.clock.seek(ms);
        Mutation::Applied
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_loop(&mut self, looping: bool) -> Mutation {
        if self.looping == looping {
            return Mutation::Unchanged;
        }
        self.looping = looping;
        self.events.emit(CompositorEvent::LoopChanged);
        Mutation::Applied
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn set_format(&mut self, format: ExportFormat) -> Mutation {
        if self.format == format {
            return Mutation::Unchanged;
        }
        self.format = format;
        self.events.emit(CompositorEvent::FormatChanged);
        Mutation::Applied
    }

    /// `(start, end)` playback limits; `None` end means the full duration.
    pub fn limits(&self) -> (u64, Option<u64>) {
        (self.time_start_ms, self.time_end_ms)
    }

    /// Restrict playback and export to `[start_ms, end_ms)`.
    pub fn set_limits(&mut self, start_ms: u64, end_ms: Option<u64>) -> Mutation {
        if self.is_recording() || end_ms.is_some_and(|end| end <= start_ms) {
            return Mutation::Rejected;
        }
        if (self.time_start_ms, self.time_end_ms) == (start_ms, end_ms) {
            return Mutation::Unchanged;
        }
        self.time_start_ms = start_ms;
        self.time_end_ms = end_ms;
        self.events.emit(CompositorEvent::LimitsChanged);
        Mutation::Applied
    }

    /// Time at which playback ends: the end limit, or the full duration.
    pub fn end_ms(&self) -> f64 {
        self.time_end_ms
            .map(|end| end as f64)
            .unwrap_or(self.duration_ms())
    }

    // Loop

    /// Drive the clock and the render loop from the caller's loop.
    ///
    /// Ticks the clock when its interval is due and runs a render cycle when the frame interval is
    /// due. Returns `true` when a cycle ran. While recording a cycle encodes one export frame; a
    /// finished export is available from [`Compositor::take_artifact`].
    pub fn pump(&mut self, now: Instant) -> CliplaneResult<bool> {
        if self.tick_timer.poll(now) {
            self.clock.tick();
        }
        if !self.render_timer.poll(now) {
            return Ok(false);
        }
        self.render_cycle()?;
        Ok(true)
    }

    /// How long the caller may sleep before the next [`Compositor::pump`] has work.
    pub fn next_deadline(&self, now: Instant) -> Duration {
        self.tick_timer
            .remaining(now)
            .min(self.render_timer.remaining(now))
    }

    /// One cycle of the render loop.
    pub fn render_cycle(&mut self) -> CliplaneResult<()> {
        if self.is_recording() {
            if let Some(artifact) = self.step_export()? {
                self.artifact = Some(artifact);
            }
            return Ok(());
        }

        self.refresh_duration();
        let end = self.end_ms();
        if end > 0.0 && self.clock.elapsed() as f64 >= end {
            self.events.emit(CompositorEvent::Ending);
            if !self.looping {
                let _ = self.pause();
            }
            self.clock.seek(self.time_start_ms);
        }

        self.draw_preview(self.clock.elapsed() as f64)?;
        self.events.emit(CompositorEvent::FrameDrawn);
        Ok(())
    }

    /// Seek to `ms` and draw the preview there. Returns the drawn surface.
    pub fn render_at(&mut self, ms: u64) -> CliplaneResult<&Surface> {
        if self.is_recording() {
            return Err(CliplaneError::invalid_mutation(
                "cannot render a preview while recording",
            ));
        }
        self.refresh_duration();
        self.clock.seek(ms);
        self.draw_preview(ms as f64)?;
        self.events.emit(CompositorEvent::FrameDrawn);
        Ok(&self.surface)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn draw_preview(&mut self, time_ms: f64) -> CliplaneResult<()> {
        let playing = self.state == TransportState::Playing;
        let mut draws = Vec::new();
        for track in self.tracks.iter_mut().rev().filter(|t| t.is_visible()) {
            draws.extend(track.prepare_frame(time_ms, playing));
        }
        let view = view_transform(self.scale, self.offset_x, self.offset_y);
        composite(
            &mut self.surface,
            self.opts.background.to_rgba8_premul(),
            view,
            &draws,
        )
    }

    // View geometry

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset_x(&self) -> f64 {
        self.offset_x
    }

    pub fn offset_y(&self) -> f64 {
        self.offset_y
    }

    pub fn set_scale(&mut self, scale: f64) -> Mutation {
        if !scale.is_finite() || scale <= 0.0 {
            return Mutation::Rejected;
        }
        self.write_view(ViewAxis::Scale, scale)
    }

    pub fn set_offset_x(&mut self, offset: f64) -> Mutation {
        self.write_view(ViewAxis::OffsetX, offset)
    }

    pub fn set_offset_y(&mut self, offset: f64) -> Mutation {
        self.write_view(ViewAxis::OffsetY, offset)
    }

    /// Back to scale 1 and no pan.
    pub fn reset_view(&mut self) {
        let _ = self.set_scale(1.0);
        let _ = self.set_offset_x(0.0);
        let _ = self.set_offset_y(0.0);
    }

    fn write_view(&mut self, axis: ViewAxis, value: f64) -> Mutation {
        if self.is_recording() || !value.is_finite() {
            return Mutation::Rejected;
        }
        let (slot, event) = match axis {
            ViewAxis::Scale => (&mut self.scale, CompositorEvent::ScaleChanged),
            ViewAxis::OffsetX => (&mut self.offset_x, CompositorEvent::OffsetXChanged),
            ViewAxis::OffsetY => (&mut self.offset_y, CompositorEvent::OffsetYChanged),
        };
        if *slot == value {
            return Mutation::Unchanged;
        }
        *slot = value;
        self.events.emit(event);
        Mutation::Applied
    }

    /// Snap an output rectangle against the canvas edges and every other clip's output rectangle.
    pub fn snap_axis(&self, x: f64, y: f64, w: f64, h: f64, except_clip: &str) -> AxisSnap {
        let mut snap = AxisSnap::default();
        let mut check = |cx: f64, cy: f64, cw: f64, ch: f64| {
            let near = |a: f64, b: f64| (a - b).abs() < SNAP_THRESHOLD_PX;
            if near(cx, x) {
                snap.x = Some(cx);
            }
            if near(cx + cw, x) {
                snap.x = Some(cx + cw);
            }
            if near(cx, x + w) {
                snap.x = Some(cx - w);
                snap.offset_x = w;
            }
            if near(cx + cw, x + w) {
                snap.x = Some(cx + cw - w);
                snap.offset_x = w;
            }
            if near(cy, y) {
                snap.y = Some(cy);
            }
            if near(cy + ch, y) {
                snap.y = Some(cy + ch);
            }
            if near(cy, y + h) {
                snap.y = Some(cy - h);
                snap.offset_y = h;
            }
            if near(cy + ch, y + h) {
                snap.y = Some(cy + ch - h);
                snap.offset_y = h;
            }
        };

        check(0.0, 0.0, f64::from(self.opts.width), f64::from(self.opts.height));
        for clip in self.tracks.iter().flat_map(Track::clips) {
            if clip.id() != except_clip {
                let p = &clip.edit_target().props;
                check(p.output_x, p.output_y, p.output_width, p.output_height);
            }
        }
        snap
    }

    // Tracks

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    /// Mutable access to a track. Call [`Compositor::refresh_duration`] (or let the next render
    /// cycle do it) after changing its clips.
    pub fn track_mut(&mut self, id: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id() == id)
    }

    /// Append an empty track. Returns its id.
    pub fn add_track(&mut self) -> CliplaneResult<String> {
        self.push_track(Track::new())
    }

    /// Append `track`. Returns its id.
    pub fn push_track(&mut self, track: Track) -> CliplaneResult<String> {
        if self.is_recording() {
            return Err(CliplaneError::invalid_mutation(
                "cannot add a track while recording",
            ));
        }
        let id = track.id().to_owned();
        self.tracks.push(track);
        self.events.emit(CompositorEvent::TracksChanged);
        self.refresh_duration();
        Ok(id)
    }

    pub fn remove_track(&mut self, id: &str) -> Option<Track> {
        if self.is_recording() {
            return None;
        }
        let pos = self.tracks.iter().position(|t| t.id() == id)?;
        let track = self.tracks.remove(pos);
        if self.selected_track.as_deref() == Some(id) {
            self.selected_track = None;
            self.events.emit(CompositorEvent::TrackSelected);
        }
        if let Some(clip) = self.selected_clip.as_deref()
            && track.clip(clip).is_some()
        {
            self.selected_clip = None;
            self.events.emit(CompositorEvent::ClipSelected);
        }
        self.events.emit(CompositorEvent::TracksChanged);
        self.refresh_duration();
        Some(track)
    }

    /// Move a track to `index` (clamped to the end). Index 0 is drawn on top.
    pub fn move_track(&mut self, id: &str, index: usize) -> Mutation {
        if self.is_recording() {
            return Mutation::Rejected;
        }
        let Some(pos) = self.tracks.iter().position(|t| t.id() == id) else {
            return Mutation::Rejected;
        };
        let index = index.min(self.tracks.len() - 1);
        if pos == index {
            return Mutation::Unchanged;
        }
        let track = self.tracks.remove(pos);
        self.tracks.insert(index, track);
        self.events.emit(CompositorEvent::TracksChanged);
        Mutation::Applied
    }

    pub fn selected_track(&self) -> Option<&str> {
        self.selected_track.as_deref()
    }

    pub fn select_track(&mut self, id: Option<&str>) -> Mutation {
        if id.is_some_and(|id| self.track(id).is_none()) {
            return Mutation::Rejected;
        }
        if self.selected_track.as_deref() == id {
            return Mutation::Unchanged;
        }
        self.selected_track = id.map(str::to_owned);
        for track in &mut self.tracks {
            let selected = Some(track.id()) == id;
            track.set_selected(selected);
        }
        self.events.emit(CompositorEvent::TrackSelected);
        Mutation::Applied
    }

    pub fn selected_clip(&self) -> Option<&str> {
        self.selected_clip.as_deref()
    }

    pub fn select_clip(&mut self, id: Option<&str>) -> Mutation {
        if let Some(id) = id
            && !self.tracks.iter().any(|t| t.clip(id).is_some())
        {
            return Mutation::Rejected;
        }
        if self.selected_clip.as_deref() == id {
            return Mutation::Unchanged;
        }
        self.selected_clip = id.map(str::to_owned);
        self.events.emit(CompositorEvent::ClipSelected);
        Mutation::Applied
    }

    /// Longest track duration.
    pub fn duration_ms(&self) -> f64 {
        self.tracks
            .iter()
            .map(Track::total_duration_ms)
            .fold(0.0, f64::max)
    }

    /// Re-read the track durations and fire [`CompositorEvent::DurationChanged`] on change.
    pub fn refresh_duration(&mut self) {
        let duration = self.duration_ms();
        if duration != self.duration_ms {
            self.duration_ms = duration;
            self.events.emit(CompositorEvent::DurationChanged);
        }
    }

    // Export

    /// Enter `Recording` and start encoding into `sink`.
    ///
    /// The export covers `[start limit, end limit or duration)`. Drive it with
    /// [`Compositor::step_export`] or the render loop.
    #[tracing::instrument(skip(self, opts, sink))]
    pub fn begin_export(
        &mut self,
        opts: &ExportOpts,
        sink: Box<dyn MediaSink>,
    ) -> CliplaneResult<()> {
        if self.is_recording() {
            return Err(CliplaneError::invalid_mutation("an export is already running"));
        }
        self.refresh_duration();
        let plan = ExportPlan {
            format: opts.format.unwrap_or(self.format),
            canvas: Canvas {
                width: self.opts.width,
                height: self.opts.height,
            },
            fps: self.opts.fps,
            background: self.opts.background.to_rgba8_premul(),
            start_ms: self.time_start_ms as f64,
            end_ms: self.end_ms(),
        };

        self.clock.pause();
        self.set_state(TransportState::Recording);
        for track in &mut self.tracks {
            track.set_recording(true);
        }
        match ExportJob::start(plan, opts, sink) {
            Ok(job) => {
                self.export = Some(job);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "export failed to start");
                self.end_recording();
                Err(err)
            }
        }
    }

    /// Encode one export frame. Returns the artifact after the last frame.
    ///
    /// Any failure aborts the export: partial output is discarded and the transport returns to
    /// `Stopped` before the error is returned.
    pub fn step_export(&mut self) -> CliplaneResult<Option<ExportArtifact>> {
        let Some(job) = self.export.as_mut() else {
            return Err(CliplaneError::invalid_mutation("no export is running"));
        };
        match job.step(&mut self.tracks) {
            Ok(None) => Ok(None),
            Ok(Some(bytes)) => {
                let (format, frames) = (job.format(), job.frames_done());
                self.export = None;
                self.end_recording();
                self.events.emit(CompositorEvent::ExportFinished);
                Ok(Some(ExportArtifact {
                    file_name: format.artifact_name(),
                    format,
                    bytes,
                    frames,
                }))
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    frame = job.frames_done(),
                    total = job.total_frames(),
                    "export failed; discarding output"
                );
                if let Some(job) = self.export.take() {
                    job.abort();
                }
                self.end_recording();
                Err(err)
            }
        }
    }

    /// Run a whole export to completion.
    #[tracing::instrument(skip(self, opts, sink))]
    pub fn export(
        &mut self,
        opts: &ExportOpts,
        sink: Box<dyn MediaSink>,
    ) -> CliplaneResult<ExportArtifact> {
        self.begin_export(opts, sink)?;
        loop {
            if let Some(artifact) = self.step_export()? {
                return Ok(artifact);
            }
        }
    }

    /// Abort a running export. Returns `false` when none was running.
    pub fn cancel_export(&mut self) -> bool {
        let Some(job) = self.export.take() else {
            return false;
        };
        tracing::debug!(frame = job.frames_done(), "export cancelled");
        job.abort();
        self.end_recording();
        true
    }

    /// `(frames done, total frames)` of the running export.
    pub fn export_progress(&self) -> Option<(u64, u64)> {
        self.export
            .as_ref()
            .map(|job| (job.frames_done(), job.total_frames()))
    }

    /// Artifact of an export that finished inside [`Compositor::pump`].
    pub fn take_artifact(&mut self) -> Option<ExportArtifact> {
        self.artifact.take()
    }

    fn end_recording(&mut self) {
        for track in &mut self.tracks {
            track.set_recording(false);
        }
        self.clock.pause();
        self.set_state(TransportState::Stopped);
    }
}

#[derive(Clone, Copy, Debug)]
enum ViewAxis {
    Scale,
    OffsetX,
    OffsetY,
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/mod.rs"]
mod tests;
