use super::*;
use crate::encode::sink::InMemorySink;
use crate::media::ColorSource;
use crate::timeline::Clip;
use std::sync::{Arc, Mutex};

fn small() -> Compositor {
    Compositor::new(CompositorOpts {
        width: 16,
        height: 16,
        fps: Fps::whole(10).unwrap(),
        ..CompositorOpts::default()
    })
    .unwrap()
}

fn add_clip(c: &mut Compositor, duration_ms: f64, color: Color) -> String {
    let track_id = c.tracks()[0].id().to_owned();
    let src = ColorSource::new(4, 4, duration_ms, color).unwrap();
    let id = c
        .track_mut(&track_id)
        .unwrap()
        .add_clip(Clip::new("clip", Box::new(src)));
    c.refresh_duration();
    id
}

fn record(c: &Compositor) -> (Arc<Mutex<Vec<CompositorEvent>>>, crate::foundation::event::Subscription) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let sub = c.events().subscribe(move |e| sink.lock().unwrap().push(*e));
    (log, sub)
}

#[test]
fn defaults() {
    let c = Compositor::new(CompositorOpts::default()).unwrap();
    assert_eq!((c.opts().width, c.opts().height), (720, 420));
    assert_eq!(c.opts().fps, Fps::whole(60).unwrap());
    assert_eq!(c.state(), TransportState::Stopped);
    assert_eq!(c.format(), ExportFormat::Mp4);
    assert_eq!(c.tracks().len(), 1);
    assert_eq!(c.scale(), 1.0);
    assert!(!c.is_looping());
}

#[test]
fn zero_sized_canvas_is_rejected() {
    let opts = CompositorOpts {
        width: 0,
        ..CompositorOpts::default()
    };
    assert!(matches!(
        Compositor::new(opts).unwrap_err(),
        CliplaneError::Validation(_)
    ));
}

#[test]
fn transport_transitions() {
    let mut c = small();
    let (log, _sub) = record(&c);

    assert_eq!(c.pause(), Mutation::Rejected);
    assert_eq!(c.play(), Mutation::Applied);
    assert_eq!(c.play(), Mutation::Rejected);
    assert_eq!(c.state(), TransportState::Playing);
    assert_eq!(c.pause(), Mutation::Applied);
    assert_eq!(c.state(), TransportState::Stopped);

    assert_eq!(
        *log.lock().unwrap(),
        vec![CompositorEvent::StateChanged, CompositorEvent::StateChanged]
    );
}

#[test]
fn view_setters_fire_on_change_only() {
    let mut c = small();
    let (log, _sub) = record(&c);

    assert_eq!(c.set_scale(1.0), Mutation::Unchanged);
    assert_eq!(c.set_scale(2.0), Mutation::Applied);
    assert_eq!(c.set_scale(0.0), Mutation::Rejected);
    assert_eq!(c.set_offset_x(5.0), Mutation::Applied);
    assert_eq!(c.set_offset_y(-3.0), Mutation::Applied);
    c.reset_view();
    assert_eq!((c.scale(), c.offset_x(), c.offset_y()), (1.0, 0.0, 0.0));

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            CompositorEvent::ScaleChanged,
            CompositorEvent::OffsetXChanged,
            CompositorEvent::OffsetYChanged,
            CompositorEvent::ScaleChanged,
            CompositorEvent::OffsetXChanged,
            CompositorEvent::OffsetYChanged,
        ]
    );
}

#[test]
fn recording_freezes_view_and_transport() {
    let mut c = small();
    add_clip(&mut c, 1000.0, Color::BLACK);
    c.begin_export(&ExportOpts::default(), Box::new(InMemorySink::new()))
        .unwrap();
    assert!(c.is_recording());
    assert!(c.tracks()[0].clips()[0].is_recording());

    let (log, _sub) = record(&c);
    assert_eq!(c.set_scale(3.0), Mutation::Rejected);
    assert_eq!(c.scale(), 1.0);
    assert_eq!(c.play(), Mutation::Rejected);
    assert_eq!(c.seek(500), Mutation::Rejected);
    assert!(c.add_track().is_err());
    assert!(log.lock().unwrap().is_empty());

    assert!(c.cancel_export());
    assert_eq!(c.state(), TransportState::Stopped);
    assert!(!c.tracks()[0].clips()[0].is_recording());
    assert!(!c.cancel_export());
}

#[test]
fn end_of_timeline_pauses_and_rewinds() {
    let mut c = small();
    add_clip(&mut c, 1000.0, Color::BLACK);
    let (log, _sub) = record(&c);

    assert_eq!(c.play(), Mutation::Applied);
    assert_eq!(c.seek(1000), Mutation::Applied);
    c.render_cycle().unwrap();

    assert_eq!(c.state(), TransportState::Stopped);
    assert_eq!(c.elapsed_ms(), 0);
    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            CompositorEvent::StateChanged,
            CompositorEvent::Ending,
            CompositorEvent::StateChanged,
            CompositorEvent::FrameDrawn,
        ]
    );
}

#[test]
fn looping_keeps_playing_from_the_start_limit() {
    let mut c = small();
    add_clip(&mut c, 1000.0, Color::BLACK);
    assert_eq!(c.set_loop(true), Mutation::Applied);
    assert_eq!(c.set_limits(200, Some(600)), Mutation::Applied);
    assert_eq!(c.set_limits(700, Some(600)), Mutation::Rejected);

    let _ = c.play();
    let _ = c.seek(650);
    c.render_cycle().unwrap();
    assert_eq!(c.state(), TransportState::Playing);
    assert_eq!(c.elapsed_ms(), 200);
}

#[test]
fn wrapped_cycle_draws_the_start_limit() {
    let mut c = small();
    let red = Color::rgba(1.0, 0.0, 0.0, 1.0);
    let green = Color::rgba(0.0, 1.0, 0.0, 1.0);
    let track_id = c.tracks()[0].id().to_owned();
    let ids = [add_clip(&mut c, 500.0, red), add_clip(&mut c, 500.0, green)];
    for id in &ids {
        let clip = c.track_mut(&track_id).unwrap().clip_mut(id).unwrap();
        let _ = clip.set_output_width(16.0);
        let _ = clip.set_output_height(16.0);
    }
    let _ = c.set_loop(true);
    let _ = c.set_limits(100, Some(800));

    let _ = c.play();
    let _ = c.seek(850);
    c.render_cycle().unwrap();
    assert_eq!(c.elapsed_ms(), 100);
    assert_eq!(c.frame().pixel(8, 8), Some([255, 0, 0, 255]));
}

#[test]
fn empty_timeline_never_ends() {
    let mut c = small();
    let (log, _sub) = record(&c);
    c.render_cycle().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![CompositorEvent::FrameDrawn]);
}

#[test]
fn preview_applies_the_view_transform() {
    let mut c = small();
    let red = Color::rgba(1.0, 0.0, 0.0, 1.0);
    let clip = add_clip(&mut c, 1000.0, red);
    let track_id = c.tracks()[0].id().to_owned();
    {
        let clip = c.track_mut(&track_id).unwrap().clip_mut(&clip).unwrap();
        let _ = clip.set_output_width(4.0);
        let _ = clip.set_output_height(4.0);
    }

    let frame = c.render_at(0).unwrap();
    assert_eq!(frame.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_ne!(frame.pixel(8, 8), Some([255, 0, 0, 255]));

    let _ = c.set_offset_x(8.0);
    let frame = c.render_at(0).unwrap();
    assert_ne!(frame.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(9, 1), Some([255, 0, 0, 255]));
}

#[test]
fn track_management() {
    let mut c = small();
    let first = c.tracks()[0].id().to_owned();
    let second = c.add_track().unwrap();
    let (log, _sub) = record(&c);

    assert_eq!(c.move_track(&second, 0), Mutation::Applied);
    assert_eq!(c.tracks()[0].id(), second);
    assert_eq!(c.move_track(&second, 0), Mutation::Unchanged);
    assert_eq!(c.move_track("nope", 0), Mutation::Rejected);

    assert_eq!(c.select_track(Some(&first)), Mutation::Applied);
    assert!(c.track(&first).unwrap().is_selected());
    assert_eq!(c.select_track(Some("nope")), Mutation::Rejected);

    assert!(c.remove_track(&first).is_some());
    assert_eq!(c.selected_track(), None);
    assert_eq!(c.tracks().len(), 1);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            CompositorEvent::TracksChanged,
            CompositorEvent::TrackSelected,
            CompositorEvent::TrackSelected,
            CompositorEvent::TracksChanged,
        ]
    );
}

#[test]
fn clip_selection_requires_a_known_clip() {
    let mut c = small();
    let id = add_clip(&mut c, 1000.0, Color::BLACK);
    assert_eq!(c.select_clip(Some("missing")), Mutation::Rejected);
    assert_eq!(c.select_clip(Some(&id)), Mutation::Applied);
    assert_eq!(c.selected_clip(), Some(id.as_str()));
    assert_eq!(c.select_clip(None), Mutation::Applied);
}

#[test]
fn duration_follows_tracks() {
    let mut c = small();
    let (log, _sub) = record(&c);
    add_clip(&mut c, 1500.0, Color::BLACK);
    assert_eq!(c.duration_ms(), 1500.0);
    c.refresh_duration();
    assert_eq!(*log.lock().unwrap(), vec![CompositorEvent::DurationChanged]);
}

#[test]
fn snapping_to_canvas_and_clips() {
    let mut c = small();
    add_clip(&mut c, 1000.0, Color::BLACK);

    // Near the canvas's left edge and another clip's right edge (240 wide by default).
    let snap = c.snap_axis(4.0, 100.0, 50.0, 20.0, "other");
    assert_eq!(snap.x, Some(0.0));
    assert_eq!(snap.y, None);

    let snap = c.snap_axis(236.0, 145.0, 50.0, 20.0, "other");
    assert_eq!(snap.x, Some(240.0));
    assert_eq!(snap.y, Some(140.0));

    // The far edge snapping onto the canvas's right border.
    let snap = c.snap_axis(-40.0, 500.0, 50.0, 20.0, "other");
    assert_eq!(snap.x, Some(16.0 - 50.0));
    assert_eq!(snap.offset_x, 50.0);
}

#[test]
fn snapping_ignores_the_moving_clip() {
    let mut c = small();
    let id = add_clip(&mut c, 1000.0, Color::BLACK);
    let snap = c.snap_axis(236.0, 500.0, 10.0, 10.0, &id);
    assert_eq!(snap.x, None);
}

#[test]
fn export_through_the_render_loop() {
    let mut c = small();
    add_clip(&mut c, 500.0, Color::BLACK);
    let sink = InMemorySink::new();
    let log = sink.log();
    c.begin_export(&ExportOpts::default(), Box::new(sink)).unwrap();
    assert_eq!(c.export_progress(), Some((0, 5)));

    while c.is_recording() {
        c.render_cycle().unwrap();
    }
    let artifact = c.take_artifact().unwrap();
    assert_eq!(artifact.frames, 5);
    assert_eq!(artifact.file_name, "animation.mp4");
    assert_eq!(log.frame_count(), 5);
    assert_eq!(c.state(), TransportState::Stopped);
}

#[test]
fn step_without_export_is_an_error() {
    let mut c = small();
    assert!(matches!(
        c.step_export().unwrap_err(),
        CliplaneError::InvalidMutation(_)
    ));
}
