use super::*;
use crate::animation::keyframe::MAX_SHADOW_BLUR_PX;
use crate::animation::presets::TransitionPreset;
use crate::compositor::CompositorOpts;
use crate::foundation::core::Color;
use crate::media::ColorSource;

fn color_resolver(doc: &ClipDoc) -> CliplaneResult<Box<dyn MediaSource>> {
    if doc.name == "broken" {
        return Err(CliplaneError::load("cannot decode"));
    }
    Ok(Box::new(ColorSource::new(8, 8, 4000.0, Color::BLACK)?))
}

fn populated() -> Compositor {
    let mut c = Compositor::new(CompositorOpts::default()).unwrap();
    let track_id = c.tracks()[0].id().to_owned();
    let track = c.track_mut(&track_id).unwrap();

    let a = track.add_clip(Clip::new(
        "a",
        Box::new(ColorSource::new(8, 8, 4000.0, Color::BLACK).unwrap()),
    ));
    let b = track.add_clip(Clip::new(
        "b",
        Box::new(ColorSource::new(8, 8, 4000.0, Color::BLACK).unwrap()),
    ));
    assert_eq!(track.set_hidden_start(&a, 500.0), crate::timeline::Mutation::Applied);
    assert_eq!(track.set_offset(&b, 6000.0), crate::timeline::Mutation::Applied);

    let clip = track.clip_mut(&b).unwrap();
    assert!(clip.add_keyframe_at(50.0).is_applied());
    assert!(
        clip.set_animation_in(Transition::new(TransitionPreset::FadeIn, 300.0))
            .is_applied()
    );
    let _ = track.set_visible(false);
    c
}

#[test]
fn project_round_trips_through_json() {
    let source = populated();
    let doc = source.export_project();
    let json = doc.to_json_pretty().unwrap();
    assert!(json.contains("\"offsetTime\""));
    assert!(json.contains("\"hiddenTimeStart\""));
    assert!(json.contains("\"currentKeyframeIndex\""));

    let parsed = ProjectDoc::from_json_str(&json).unwrap();
    assert_eq!(parsed, doc);

    let mut target = Compositor::new(CompositorOpts::default()).unwrap();
    let restored = target.import_project(&parsed, color_resolver).unwrap();
    assert_eq!(restored, 2);

    // The imported track is appended after the default one.
    let again = target.export_project();
    assert_eq!(again.tracks[1], doc.tracks[0]);
    assert!(!target.tracks()[1].is_visible());
    assert_eq!(target.duration_ms(), 10_000.0);
}

#[test]
fn failing_and_invalid_clips_are_skipped() {
    let mut doc = populated().export_project();
    let mut broken = doc.tracks[0].clips[0].clone();
    broken.name = "broken".to_owned();
    broken.offset_time = 20_000.0;
    let mut overlapping = doc.tracks[0].clips[0].clone();
    overlapping.name = "overlap".to_owned();
    let mut bad_trim = doc.tracks[0].clips[0].clone();
    bad_trim.name = "trim".to_owned();
    bad_trim.offset_time = 30_000.0;
    bad_trim.hidden_time_end = 9_000.0;
    doc.tracks[0].clips.extend([broken, overlapping, bad_trim]);

    let mut c = Compositor::new(CompositorOpts::default()).unwrap();
    assert_eq!(c.import_project(&doc, color_resolver).unwrap(), 2);
    assert_eq!(c.tracks()[1].len(), 2);
}

#[test]
fn restore_validates_keyframes() {
    let doc = populated().export_project();
    let mut clip = doc.tracks[0].clips[1].clone();
    clip.keyframes[1].time_point = 0.0;
    let src = Box::new(ColorSource::new(8, 8, 4000.0, Color::BLACK).unwrap());
    assert!(matches!(
        clip.restore(src).unwrap_err(),
        CliplaneError::Validation(_)
    ));

    clip.keyframes.clear();
    let src = Box::new(ColorSource::new(8, 8, 4000.0, Color::BLACK).unwrap());
    assert!(clip.restore(src).is_err());
}

#[test]
fn restore_bounds_shadow_blur() {
    let doc = populated().export_project();
    let mut clip = doc.tracks[0].clips[0].clone();
    clip.keyframes[0].props.shadow_blur = 1.0e10;
    let src = Box::new(ColorSource::new(8, 8, 4000.0, Color::BLACK).unwrap());
    assert!(matches!(
        clip.restore(src).unwrap_err(),
        CliplaneError::Validation(_)
    ));

    clip.keyframes[0].props.shadow_blur = MAX_SHADOW_BLUR_PX;
    let src = Box::new(ColorSource::new(8, 8, 4000.0, Color::BLACK).unwrap());
    assert!(clip.restore(src).is_ok());
}

#[test]
fn garbage_json_is_a_serde_error() {
    assert!(matches!(
        ProjectDoc::from_json_str("{ not json").unwrap_err(),
        CliplaneError::Serde(_)
    ));
}

#[test]
fn file_resolver_requires_a_source() {
    let doc = populated().export_project();
    let mut resolve = file_resolver(1000.0);
    assert!(matches!(
        resolve(&doc.tracks[0].clips[0]).err(),
        Some(CliplaneError::Load(_))
    ));
}
