use super::*;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::whole(10).unwrap(),
        frames: 4,
        audio: None,
    }
}

#[test]
fn records_frames_in_order() {
    let mut sink = InMemorySink::new();
    let log = sink.log();
    sink.begin(cfg()).unwrap();

    let frame = Surface::new(2, 2);
    sink.push_video(&frame, 0, true).unwrap();
    sink.push_video(&frame, 100_000, false).unwrap();
    let bytes = sink.finish().unwrap();

    assert_eq!(bytes.len(), 2 * 2 * 2 * 4);
    assert_eq!(log.timestamps(), vec![0, 100_000]);
    let snap = log.snapshot();
    assert!(snap.finished);
    assert!(!snap.aborted);
    assert!(snap.frames[0].key);
    assert!(!snap.frames[1].key);
}

#[test]
fn rejects_out_of_order_and_wrong_size() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    sink.push_video(&Surface::new(2, 2), 100, true).unwrap();

    assert!(sink.push_video(&Surface::new(2, 2), 100, false).is_err());
    assert!(sink.push_video(&Surface::new(3, 2), 200, false).is_err());
    assert_eq!(sink.log().frame_count(), 1);
}

#[test]
fn push_before_begin_fails() {
    let mut sink = InMemorySink::new();
    let err = sink.push_video(&Surface::new(2, 2), 0, true).unwrap_err();
    assert!(matches!(err, CliplaneError::Encode(_)));
}

#[test]
fn injected_failure_and_abort_are_logged() {
    let mut sink = InMemorySink::failing_at(1);
    let log = sink.log();
    sink.begin(cfg()).unwrap();
    sink.push_video(&Surface::new(2, 2), 0, true).unwrap();
    assert!(sink.push_video(&Surface::new(2, 2), 1, false).is_err());
    sink.abort();

    let snap = log.snapshot();
    assert!(snap.aborted);
    assert!(!snap.finished);
    assert_eq!(snap.frames.len(), 1);
}
