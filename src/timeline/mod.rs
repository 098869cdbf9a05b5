//! Clips and the tracks that place them in time.

/// One media source placed on a track.
pub mod clip;
mod clip_edit;
/// Non-overlapping sequence of clips.
pub mod track;

pub use self::clip::{Clip, ClipEvent, SEEK_TOLERANCE_MS};
pub use self::track::{Track, TrackEvent};

/// Outcome of a property write.
///
/// Invalid writes are not errors: they leave the state untouched and fire no event.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// The value changed and the matching change event fired.
    Applied,
    /// The value was already current; nothing fired.
    Unchanged,
    /// The write violated a range, collision or recording constraint.
    Rejected,
}

impl Mutation {
    pub fn is_applied(self) -> bool {
        self == Mutation::Applied
    }

    pub fn is_rejected(self) -> bool {
        self == Mutation::Rejected
    }
}
