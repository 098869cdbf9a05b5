use super::*;
use crate::foundation::core::Color;
use crate::media::ColorSource;
use std::sync::{Arc, Mutex};

fn clip(duration_ms: f64) -> Clip {
    let src = ColorSource::new(16, 16, duration_ms, Color::BLACK).unwrap();
    Clip::new("c", Box::new(src))
}

fn assert_disjoint(track: &Track) {
    let spans: Vec<_> = track.clips().iter().map(Clip::placement).collect();
    for (i, a) in spans.iter().enumerate() {
        for b in &spans[i + 1..] {
            assert!(a.1 <= b.0 || b.1 <= a.0, "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn clips_append_at_free_time() {
    let mut track = Track::new();
    assert_eq!(track.free_time(), 0.0);

    let a = track.add_clip(clip(1000.0));
    let b = track.add_clip(clip(500.0));
    assert_eq!(track.clip(&a).unwrap().offset_ms(), 0.0);
    assert_eq!(track.clip(&b).unwrap().offset_ms(), 1000.0);
    assert_eq!(track.total_duration_ms(), 1500.0);
    assert_disjoint(&track);
}

#[test]
fn overlapping_insert_is_rejected() {
    let mut track = Track::new();
    track.add_clip(clip(5000.0));

    let err = track.insert_at(clip(10.0), 0.0).unwrap_err();
    assert!(matches!(err, CliplaneError::InvalidMutation(_)));
    assert_eq!(track.len(), 1);

    assert!(track.insert_at(clip(10.0), 5000.0).is_ok());
    assert_eq!(track.len(), 2);
}

#[test]
fn collision_rules() {
    let mut track = Track::new();
    let a = track.insert_at(clip(100.0), 100.0).unwrap();

    assert!(track.check_collision(-1.0, 10.0, &[]));
    assert!(!track.check_collision(0.0, 100.0, &[]));
    assert!(!track.check_collision(200.0, 300.0, &[]));
    assert!(track.check_collision(150.0, 160.0, &[]));
    assert!(track.check_collision(50.0, 101.0, &[]));
    assert!(!track.check_collision(150.0, 160.0, &[a.as_str()]));
}

#[test]
fn moves_that_overlap_leave_offsets_untouched() {
    let mut track = Track::new();
    let a = track.add_clip(clip(1000.0));
    let b = track.add_clip(clip(1000.0));

    assert_eq!(track.set_offset(&b, 500.0), Mutation::Rejected);
    assert_eq!(track.set_offset(&a, -1.0), Mutation::Rejected);
    assert_eq!(track.clip(&a).unwrap().offset_ms(), 0.0);
    assert_eq!(track.clip(&b).unwrap().offset_ms(), 1000.0);

    assert_eq!(track.set_offset(&b, 2500.0), Mutation::Applied);
    assert_eq!(track.total_duration_ms(), 3500.0);
    assert_eq!(track.set_offset(&a, 1400.0), Mutation::Applied);
    assert_disjoint(&track);
}

#[test]
fn trims_are_collision_checked() {
    let mut track = Track::new();
    let a = track.add_clip(clip(1000.0));
    let b = track.add_clip(clip(1000.0));

    assert_eq!(track.set_hidden_end(&a, 800.0), Mutation::Applied);
    assert_eq!(track.total_duration_ms(), 2000.0);
    assert_eq!(track.set_offset(&b, 800.0), Mutation::Applied);

    // Growing `a` back would run into `b`.
    assert_eq!(track.set_hidden_end(&a, 1000.0), Mutation::Rejected);
    assert_eq!(track.set_hidden_start(&b, 200.0), Mutation::Applied);
    assert_eq!(track.total_duration_ms(), 1600.0);
    assert_eq!(track.set_offset(&b, 600.0), Mutation::Rejected);
    assert_disjoint(&track);
}

#[test]
fn duration_event_fires_on_change_only() {
    let mut track = Track::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let _sub = track.events().subscribe(move |e| sink.lock().unwrap().push(*e));

    let a = track.add_clip(clip(1000.0));
    assert_eq!(track.set_offset(&a, 0.0), Mutation::Unchanged);
    track.remove_clip(&a).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            TrackEvent::ClipsChanged,
            TrackEvent::DurationChanged,
            TrackEvent::ClipsChanged,
            TrackEvent::DurationChanged,
        ]
    );
    assert_eq!(track.total_duration_ms(), 0.0);
}

#[test]
fn unknown_media_fires_load_failure() {
    let mut track = Track::new();
    let hits = Arc::new(Mutex::new(0));
    let h = Arc::clone(&hits);
    let _sub = track
        .events()
        .subscribe_named("LOAD_ERROR", move || *h.lock().unwrap() += 1)
        .unwrap();

    let err = track
        .load_clip(Path::new("notes.txt"), 1000.0)
        .unwrap_err();
    assert!(matches!(err, CliplaneError::Load(_)));
    assert_eq!(*hits.lock().unwrap(), 1);
    assert!(track.is_empty());
}

#[test]
fn prepare_frame_collects_visible_clips_in_order() {
    let mut track = Track::new();
    track.add_clip(clip(1000.0));
    track.add_clip(clip(1000.0));

    assert_eq!(track.prepare_frame(500.0, false).len(), 1);
    assert_eq!(track.prepare_frame(1500.0, false).len(), 1);
    assert!(track.prepare_frame(2500.0, false).is_empty());
}

#[test]
fn hidden_track_keeps_its_flag() {
    let mut track = Track::new();
    assert_eq!(track.set_visible(false), Mutation::Applied);
    assert_eq!(track.set_visible(false), Mutation::Unchanged);
    assert!(!track.is_visible());
}

#[test]
fn tracks_can_start_hidden() {
    let mut track = Track::with_visibility(false);
    assert!(!track.is_visible());
    assert!(track.is_empty());
    assert_eq!(track.set_visible(false), Mutation::Unchanged);
    assert_eq!(track.set_visible(true), Mutation::Applied);
    assert_ne!(track.id(), Track::with_visibility(true).id());
}
