pub(crate) mod ease;
pub(crate) mod keyframe;
pub(crate) mod presets;
pub(crate) mod resolve;
