use std::path::Path;

use crate::animation::keyframe::{Keyframe, interval_fits};
use crate::animation::presets::Transition;
use crate::compositor::Compositor;
use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::media::{MediaSource, open_media};
use crate::timeline::{Clip, Track};

/// Serializable form of every track and clip of a compositor.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDoc {
    pub tracks: Vec<TrackDoc>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDoc {
    #[serde(default = "visible_default")]
    pub visible: bool,
    #[serde(default)]
    pub clips: Vec<ClipDoc>,
}

fn visible_default() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipDoc {
    pub name: String,
    pub keyframes: Vec<Keyframe>,
    pub offset_time: f64,
    pub hidden_time_start: f64,
    pub hidden_time_end: f64,
    #[serde(default)]
    pub current_keyframe_index: usize,
    #[serde(default)]
    pub animation_in: Transition,
    #[serde(default)]
    pub animation_out: Transition,
    /// Where the media came from, when the source can say.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ProjectDoc {
    pub fn from_json_str(s: &str) -> CliplaneResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> CliplaneResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliplaneError::load(format!("failed to read project '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> CliplaneResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl TrackDoc {
    pub fn from_track(track: &Track) -> Self {
        Self {
            visible: track.is_visible(),
            clips: track.clips().iter().map(ClipDoc::from_clip).collect(),
        }
    }
}

impl ClipDoc {
    pub fn from_clip(clip: &Clip) -> Self {
        Self {
            name: clip.name().to_owned(),
            keyframes: clip.keyframes().to_vec(),
            offset_time: clip.offset_ms(),
            hidden_time_start: clip.hidden_start_ms(),
            hidden_time_end: clip.hidden_end_ms(),
            current_keyframe_index: clip.current_keyframe_index(),
            animation_in: clip.animation_in(),
            animation_out: clip.animation_out(),
            source: clip.source().uri().map(str::to_owned),
        }
    }

    /// Rebuild a clip around an already loaded `source`, re-applying every stored property.
    ///
    /// Values that break a clip invariant are a `Validation` error.
    pub fn restore(&self, source: Box<dyn MediaSource>) -> CliplaneResult<Clip> {
        let mut clip = Clip::new(self.name.clone(), source);
        let resource = clip.resource_duration_ms();

        if !(0.0 <= self.hidden_time_start
            && self.hidden_time_start <= self.hidden_time_end
            && self.hidden_time_end <= resource)
        {
            return Err(CliplaneError::validation(format!(
                "clip '{}': trim window [{}, {}] does not fit media of {resource}ms",
                self.name, self.hidden_time_start, self.hidden_time_end
            )));
        }
        if !self.offset_time.is_finite() || self.offset_time < 0.0 {
            return Err(CliplaneError::validation(format!(
                "clip '{}': offsetTime must be >= 0",
                self.name
            )));
        }
        if self.keyframes.is_empty() {
            return Err(CliplaneError::validation(format!(
                "clip '{}': at least one keyframe is required",
                self.name
            )));
        }
        for (i, k) in self.keyframes.iter().enumerate() {
            if !interval_fits(&self.keyframes, Some(i), k.time_point, k.duration) {
                return Err(CliplaneError::validation(format!(
                    "clip '{}': keyframe {i} interval [{}, {}) overlaps or leaves [0, 100]",
                    self.name,
                    k.time_point,
                    k.time_point + k.duration
                )));
            }
            if !k.shadow_blur_fits() {
                return Err(CliplaneError::validation(format!(
                    "clip '{}': keyframe {i} shadow blur {} is out of range",
                    self.name, k.props.shadow_blur
                )));
            }
        }
        for t in [self.animation_in, self.animation_out] {
            if !t.duration_ms.is_finite() || t.duration_ms < 0.0 {
                return Err(CliplaneError::validation(format!(
                    "clip '{}': transition duration must be >= 0",
                    self.name
                )));
            }
        }

        clip.offset_ms = self.offset_time;
        clip.hidden_start_ms = self.hidden_time_start;
        clip.hidden_end_ms = self.hidden_time_end;
        clip.keyframes = self.keyframes.clone();
        clip.current = self.current_keyframe_index.min(self.keyframes.len() - 1);
        clip.enter = self.animation_in;
        clip.exit = self.animation_out;
        Ok(clip)
    }
}

/// Resolver that reopens each clip from its recorded `source` path.
pub fn file_resolver(
    image_duration_ms: f64,
) -> impl FnMut(&ClipDoc) -> CliplaneResult<Box<dyn MediaSource>> {
    move |doc: &ClipDoc| {
        let uri = doc.source.as_deref().ok_or_else(|| {
            CliplaneError::load(format!("clip '{}' has no recorded source", doc.name))
        })?;
        open_media(Path::new(uri), image_duration_ms)
    }
}

impl Compositor {
    /// Snapshot every track and clip.
    pub fn export_project(&self) -> ProjectDoc {
        ProjectDoc {
            tracks: self.tracks().iter().map(TrackDoc::from_track).collect(),
        }
    }

    /// Append the tracks of `doc`, loading each clip's media through `resolve`.
    ///
    /// Clips whose media fails to load, whose stored values are invalid, or that would overlap an
    /// earlier clip are skipped with a warning. Returns the number of clips restored.
    #[tracing::instrument(skip_all, fields(tracks = doc.tracks.len()))]
    pub fn import_project<F>(&mut self, doc: &ProjectDoc, mut resolve: F) -> CliplaneResult<usize>
    where
        F: FnMut(&ClipDoc) -> CliplaneResult<Box<dyn MediaSource>>,
    {
        if self.is_recording() {
            return Err(CliplaneError::invalid_mutation(
                "cannot import a project while recording",
            ));
        }

        let mut restored = 0;
        for track_doc in &doc.tracks {
            let mut track = Track::with_visibility(track_doc.visible);
            for clip_doc in &track_doc.clips {
                let clip = resolve(clip_doc).and_then(|source| clip_doc.restore(source));
                let placed = clip.and_then(|clip| track.insert_at(clip, clip_doc.offset_time));
                match placed {
                    Ok(_) => restored += 1,
                    Err(err) => {
                        tracing::warn!(clip = %clip_doc.name, error = %err, "skipping clip on import");
                    }
                }
            }
            self.push_track(track)?;
        }
        Ok(restored)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/project.rs"]
mod tests;
