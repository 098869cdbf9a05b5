use super::*;
use crate::animation::presets::TransitionPreset;
use crate::foundation::core::Color;
use crate::foundation::event::Subscription;
use crate::media::ColorSource;
use std::sync::Mutex;

fn clip(duration_ms: f64) -> Clip {
    let src = ColorSource::new(64, 36, duration_ms, Color::rgba(1.0, 0.0, 0.0, 1.0)).unwrap();
    Clip::new("red", Box::new(src))
}

fn record(clip: &Clip) -> (Subscription, Arc<Mutex<Vec<ClipEvent>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let sub = clip.events().subscribe(move |e| sink.lock().unwrap().push(*e));
    (sub, log)
}

#[test]
fn fresh_clip_covers_whole_source() {
    let c = clip(5000.0);
    assert_eq!(c.hidden_start_ms(), 0.0);
    assert_eq!(c.hidden_end_ms(), 5000.0);
    assert_eq!(c.duration_ms(), 5000.0);
    assert_eq!(c.keyframes().len(), 1);

    let base = &c.keyframes()[0];
    assert_eq!(base.time_point, 0.0);
    assert_eq!(base.duration, 0.0);
    assert_eq!((base.props.crop_image_w, base.props.crop_image_h), (64.0, 36.0));
    assert_eq!((base.props.output_width, base.props.output_height), (240.0, 140.0));
}

#[test]
fn single_keyframe_clip_is_active_mid_window() {
    let c = clip(5000.0);
    let local = c.local_ms(2000.0);
    assert_eq!(local, 2000.0);

    let resolved = c.resolve_properties(local).unwrap();
    assert_eq!(resolved.phase, Phase::Active);
    assert_eq!(resolved.props, c.keyframes()[0].props);
}

#[test]
fn prepare_outside_window_draws_nothing_and_rewinds() {
    let mut c = clip(1000.0);
    assert!(c.prepare(500.0, false).unwrap().is_some());
    assert_eq!(c.source().position_ms(), 500.0);

    assert!(c.prepare(1500.0, false).unwrap().is_none());
    assert_eq!(c.source().position_ms(), 0.0);
    assert!(!c.source().is_playing());
}

#[test]
fn small_drift_does_not_reseek() {
    let mut c = clip(5000.0);
    c.prepare(1000.0, false).unwrap();
    assert_eq!(c.source().position_ms(), 1000.0);

    c.prepare(1000.0 + SEEK_TOLERANCE_MS - 10.0, false).unwrap();
    assert_eq!(c.source().position_ms(), 1000.0);

    c.prepare(1000.0 + SEEK_TOLERANCE_MS + 10.0, false).unwrap();
    assert_eq!(c.source().position_ms(), 1000.0 + SEEK_TOLERANCE_MS + 10.0);
}

#[test]
fn drift_at_the_tolerance_is_kept() {
    let mut c = clip(5000.0);
    c.prepare(2000.0, false).unwrap();
    c.prepare(2000.0 - SEEK_TOLERANCE_MS, false).unwrap();
    assert_eq!(c.source().position_ms(), 2000.0);
    c.prepare(1999.0 - SEEK_TOLERANCE_MS, false).unwrap();
    assert_eq!(c.source().position_ms(), 1999.0 - SEEK_TOLERANCE_MS);
}

#[test]
fn recording_seeks_exactly_and_never_plays() {
    let mut c = clip(5000.0);
    c.set_recording(true);
    c.prepare(1000.0, true).unwrap();
    c.prepare(1010.0, true).unwrap();
    assert_eq!(c.source().position_ms(), 1010.0);
    assert!(!c.source().is_playing());
}

#[test]
fn playing_transport_plays_source_in_active_window() {
    let mut c = clip(5000.0);
    c.prepare(100.0, true).unwrap();
    assert!(c.source().is_playing());
    c.prepare(100.0, false).unwrap();
    assert!(!c.source().is_playing());
}

#[test]
fn trim_start_shifts_media_position() {
    let mut c = clip(5000.0);
    assert_eq!(c.write_hidden_start(500.0), Mutation::Applied);
    c.prepare(100.0, false).unwrap();
    assert_eq!(c.source().position_ms(), 600.0);
    assert_eq!(c.duration_ms(), 4500.0);
}

#[test]
fn trim_window_stays_ordered_and_inside_media() {
    let mut c = clip(5000.0);
    assert_eq!(c.write_hidden_end(6000.0), Mutation::Rejected);
    assert_eq!(c.write_hidden_end(3000.0), Mutation::Applied);
    assert_eq!(c.write_hidden_start(3500.0), Mutation::Rejected);
    assert_eq!(c.write_hidden_start(-1.0), Mutation::Rejected);
    assert_eq!(c.write_hidden_end(2000.0), Mutation::Applied);
    assert_eq!(c.write_hidden_start(2000.0), Mutation::Applied);
    assert_eq!(c.duration_ms(), 0.0);
    assert_eq!(c.write_hidden_end(1999.0), Mutation::Rejected);
}

#[test]
fn negative_offset_is_rejected() {
    let mut c = clip(1000.0);
    assert_eq!(c.write_offset(-5.0), Mutation::Rejected);
    assert_eq!(c.write_offset(0.0), Mutation::Unchanged);
    assert_eq!(c.write_offset(250.0), Mutation::Applied);
    assert_eq!(c.placement(), (250.0, 1250.0));
}

#[test]
fn enter_transition_draws_before_offset() {
    let mut c = clip(1000.0);
    assert_eq!(c.write_offset(1000.0), Mutation::Applied);
    assert_eq!(
        c.set_animation_in(Transition::new(TransitionPreset::FadeIn, 500.0)),
        Mutation::Applied
    );

    assert!(c.prepare(400.0, false).unwrap().is_none());
    let draw = c.prepare(750.0, false).unwrap().unwrap();
    assert!(draw.props.opacity > 0.0 && draw.props.opacity < 100.0);
    // Held on the first frame of the trim window.
    assert_eq!(c.source().position_ms(), 0.0);
}

#[test]
fn name_and_transition_events_fire_once() {
    let mut c = clip(1000.0);
    let (_sub, log) = record(&c);

    assert_eq!(c.set_name("blue"), Mutation::Applied);
    assert_eq!(c.set_name("blue"), Mutation::Unchanged);
    let fade = Transition::new(TransitionPreset::FadeIn, 200.0);
    assert_eq!(c.set_animation_out(fade), Mutation::Applied);
    assert_eq!(c.set_animation_out(fade), Mutation::Unchanged);

    assert_eq!(
        *log.lock().unwrap(),
        vec![ClipEvent::NameChanged, ClipEvent::AnimationOutChanged]
    );
}

#[test]
fn recording_freezes_placement_and_transitions() {
    let mut c = clip(1000.0);
    c.set_recording(true);
    let (_sub, log) = record(&c);

    assert_eq!(c.write_offset(10.0), Mutation::Rejected);
    assert_eq!(c.write_hidden_end(500.0), Mutation::Rejected);
    assert_eq!(
        c.set_animation_in(Transition::new(TransitionPreset::FadeIn, 200.0)),
        Mutation::Rejected
    );
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn event_names_resolve_from_external_identifiers() {
    assert_eq!(
        ClipEvent::parse_name("CHANGE_OUTPUTX").unwrap(),
        ClipEvent::OutputXChanged
    );
    assert_eq!(
        ClipEvent::parse_name("CHANGE_ANIMATIONS_LIST").unwrap(),
        ClipEvent::KeyframesChanged
    );
    assert!(ClipEvent::parse_name("CHANGE_NOTHING").is_err());
}

#[test]
fn unnamed_source_gets_short_generated_name() {
    let src = ColorSource::new(4, 4, 100.0, Color::BLACK).unwrap();
    let c = Clip::from_source(Box::new(src));
    assert_eq!(c.name().len(), 7);
}
