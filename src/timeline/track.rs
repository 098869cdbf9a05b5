use std::path::Path;

use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::foundation::event::{Emitter, EventName};
use crate::media::open_media;
use crate::render::draw::ClipDraw;
use crate::timeline::Mutation;
use crate::timeline::clip::Clip;

/// Change notifications of a [`Track`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackEvent {
    /// A clip was added or removed.
    ClipsChanged,
    SelectionChanged,
    DurationChanged,
    VisibilityChanged,
    /// A media file could not be turned into a clip; nothing was added.
    ClipLoadFailed,
}

impl EventName for TrackEvent {
    const ALL: &'static [Self] = &[
        Self::ClipsChanged,
        Self::SelectionChanged,
        Self::DurationChanged,
        Self::VisibilityChanged,
        Self::ClipLoadFailed,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::ClipsChanged => "CHANGE_RESOURCES",
            Self::SelectionChanged => "CHANGE_IS_SELECT",
            Self::DurationChanged => "CHANGE_DURATION",
            Self::VisibilityChanged => "CHANGE_VISIBLE",
            Self::ClipLoadFailed => "LOAD_ERROR",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Placement {
    Offset,
    HiddenStart,
    HiddenEnd,
}

/// Ordered, non-overlapping sequence of clips.
///
/// Clip placement intervals `[offset, offset + duration)` never intersect; every write that
/// moves or resizes a clip is checked against its siblings and rejected on overlap.
#[derive(Debug)]
pub struct Track {
    id: String,
    visible: bool,
    selected: bool,
    clips: Vec<Clip>,
    total_duration_ms: f64,
    events: Emitter<TrackEvent>,
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

impl Track {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            visible: true,
            selected: false,
            clips: Vec::new(),
            total_duration_ms: 0.0,
            events: Emitter::new(),
        }
    }

    /// Empty track that starts hidden or shown without firing a visibility event.
    pub(crate) fn with_visibility(visible: bool) -> Self {
        Self {
            visible,
            ..Self::new()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn events(&self) -> &Emitter<TrackEvent> {
        &self.events
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self, id: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id() == id)
    }

    /// Mutable access for edit-target setters. Placement goes through the track setters.
    pub fn clip_mut(&mut self, id: &str) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) -> Mutation {
        if visible == self.visible {
            return Mutation::Unchanged;
        }
        self.visible = visible;
        self.events.emit(TrackEvent::VisibilityChanged);
        Mutation::Applied
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        if selected != self.selected {
            self.selected = selected;
            self.events.emit(TrackEvent::SelectionChanged);
        }
    }

    /// Latest end time over all clips, 0 when empty.
    pub fn total_duration_ms(&self) -> f64 {
        self.total_duration_ms
    }

    /// Whether `[start, end)` is unavailable: negative start, or intersecting any clip whose id is
    /// not in `except`.
    pub fn check_collision(&self, start: f64, end: f64, except: &[&str]) -> bool {
        if start < 0.0 {
            return true;
        }
        self.clips
            .iter()
            .filter(|c| !except.contains(&c.id()))
            .any(|c| {
                let (s, e) = c.placement();
                end > s && e > start
            })
    }

    /// Smallest offset at which a clip can be appended.
    pub fn free_time(&self) -> f64 {
        self.clips
            .iter()
            .map(|c| c.placement().1)
            .fold(0.0, f64::max)
    }

    /// Append `clip` at [`Track::free_time`]. Returns its id.
    pub fn add_clip(&mut self, mut clip: Clip) -> String {
        clip.offset_ms = self.free_time();
        let id = clip.id().to_owned();
        tracing::debug!(clip = %id, offset_ms = clip.offset_ms, "clip appended");
        self.clips.push(clip);
        self.events.emit(TrackEvent::ClipsChanged);
        self.refresh_duration();
        id
    }

    /// Place `clip` at `offset_ms`, failing with [`CliplaneError::InvalidMutation`] on overlap.
    pub fn insert_at(&mut self, mut clip: Clip, offset_ms: f64) -> CliplaneResult<String> {
        let end = offset_ms + clip.duration_ms();
        if !offset_ms.is_finite() || self.check_collision(offset_ms, end, &[]) {
            return Err(CliplaneError::invalid_mutation(format!(
                "clip '{}' at [{offset_ms}, {end}) collides with track {}",
                clip.name(),
                self.id
            )));
        }
        clip.offset_ms = offset_ms;
        let id = clip.id().to_owned();
        self.clips.push(clip);
        self.events.emit(TrackEvent::ClipsChanged);
        self.refresh_duration();
        Ok(id)
    }

    /// Open a media file and append it as a clip.
    ///
    /// On failure nothing is added, [`TrackEvent::ClipLoadFailed`] fires and the load error is
    /// returned.
    pub fn load_clip(&mut self, path: &Path, image_duration_ms: f64) -> CliplaneResult<String> {
        match open_media(path, image_duration_ms) {
            Ok(source) => Ok(self.add_clip(Clip::from_source(source))),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "media failed to load");
                self.events.emit(TrackEvent::ClipLoadFailed);
                Err(err)
            }
        }
    }

    /// Remove and return the clip with `id`.
    pub fn remove_clip(&mut self, id: &str) -> Option<Clip> {
        let pos = self.clips.iter().position(|c| c.id() == id)?;
        let clip = self.clips.remove(pos);
        self.events.emit(TrackEvent::ClipsChanged);
        self.refresh_duration();
        Some(clip)
    }

    /// Move a clip on the track.
    pub fn set_offset(&mut self, id: &str, offset_ms: f64) -> Mutation {
        self.place(id, Placement::Offset, offset_ms)
    }

    /// Trim the start of a clip's media; the clip keeps its offset and gets shorter.
    pub fn set_hidden_start(&mut self, id: &str, ms: f64) -> Mutation {
        self.place(id, Placement::HiddenStart, ms)
    }

    /// Trim the end of a clip's media.
    pub fn set_hidden_end(&mut self, id: &str, ms: f64) -> Mutation {
        self.place(id, Placement::HiddenEnd, ms)
    }

    fn place(&mut self, id: &str, what: Placement, ms: f64) -> Mutation {
        let Some(pos) = self.clips.iter().position(|c| c.id() == id) else {
            return Mutation::Rejected;
        };
        let clip = &self.clips[pos];
        let (start, end) = match what {
            Placement::Offset => (ms, ms + clip.duration_ms()),
            Placement::HiddenStart => (
                clip.offset_ms(),
                clip.offset_ms() + clip.hidden_end_ms() - ms,
            ),
            Placement::HiddenEnd => (
                clip.offset_ms(),
                clip.offset_ms() + ms - clip.hidden_start_ms(),
            ),
        };
        if !ms.is_finite() || self.check_collision(start, end, &[id]) {
            return Mutation::Rejected;
        }

        let clip = &mut self.clips[pos];
        let outcome = match what {
            Placement::Offset => clip.write_offset(ms),
            Placement::HiddenStart => clip.write_hidden_start(ms),
            Placement::HiddenEnd => clip.write_hidden_end(ms),
        };
        if outcome.is_applied() {
            self.refresh_duration();
        }
        outcome
    }

    fn refresh_duration(&mut self) {
        let total = self.free_time();
        if total != self.total_duration_ms {
            self.total_duration_ms = total;
            self.events.emit(TrackEvent::DurationChanged);
        }
    }

    pub(crate) fn set_recording(&mut self, recording: bool) {
        for clip in &mut self.clips {
            clip.set_recording(recording);
        }
    }

    /// Sync every clip to `time_ms` and collect what to draw, in clip order.
    ///
    /// A clip whose frame cannot be decoded is skipped for this frame.
    pub fn prepare_frame(&mut self, time_ms: f64, playing: bool) -> Vec<ClipDraw> {
        let mut draws = Vec::new();
        for clip in &mut self.clips {
            match clip.prepare(time_ms, playing) {
                Ok(Some(draw)) => draws.push(draw),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(clip = %clip.id(), error = %err, "skipping clip frame");
                }
            }
        }
        draws
    }

    /// Like [`Track::prepare_frame`], but the first decode failure is returned.
    pub(crate) fn try_prepare_frame(&mut self, time_ms: f64) -> CliplaneResult<Vec<ClipDraw>> {
        let mut draws = Vec::new();
        for clip in &mut self.clips {
            if let Some(draw) = clip.prepare(time_ms, false)? {
                draws.push(draw);
            }
        }
        Ok(draws)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/track.rs"]
mod tests;
