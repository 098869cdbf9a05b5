use super::*;
use crate::animation::keyframe::KeyframeProps;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::Fps;
use std::sync::Arc;

const BG: Rgba8Premul = Rgba8Premul {
    r: 0,
    g: 0,
    b: 255,
    a: 255,
};

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 4,
        height: 4,
        fps: Fps::whole(10).unwrap(),
        frames: 4,
        audio: None,
    }
}

fn red_quad() -> ClipDraw {
    let red = Rgba8Premul {
        r: 255,
        g: 0,
        b: 0,
        a: 255,
    };
    ClipDraw {
        props: KeyframeProps {
            output_width: 2.0,
            output_height: 2.0,
            ..KeyframeProps::for_source(2, 2)
        },
        image: Arc::new(Surface::filled(2, 2, red)),
    }
}

#[test]
fn composites_frames_off_thread() {
    let sink = InMemorySink::new();
    let log = sink.log();
    let worker = ExportWorker::spawn(Box::new(sink)).unwrap();

    worker.begin(cfg(), BG).unwrap();
    worker
        .print_frame(FrameIndex(0), 0, true, vec![red_quad()])
        .unwrap();
    worker.print_frame(FrameIndex(1), 100_000, false, Vec::new()).unwrap();
    let bytes = worker.finish().unwrap();

    assert_eq!(bytes.len(), 2 * 4 * 4 * 4);
    let snap = log.snapshot();
    assert!(snap.finished);
    assert_eq!(&snap.frames[0].data[0..4], &[255, 0, 0, 255]);
    assert_eq!(&snap.frames[0].data[12..16], &[0, 0, 255, 255]);
    assert_eq!(&snap.frames[1].data[0..4], &[0, 0, 255, 255]);
}

#[test]
fn frame_before_begin_fails() {
    let worker = ExportWorker::spawn(Box::new(InMemorySink::new())).unwrap();
    let err = worker
        .print_frame(FrameIndex(0), 0, true, Vec::new())
        .unwrap_err();
    assert!(matches!(err, CliplaneError::Encode(_)));
    worker.abort();
}

#[test]
fn sink_failure_is_reported_and_abort_reaches_sink() {
    let sink = InMemorySink::failing_at(1);
    let log = sink.log();
    let worker = ExportWorker::spawn(Box::new(sink)).unwrap();
    worker.begin(cfg(), BG).unwrap();
    worker.print_frame(FrameIndex(0), 0, true, Vec::new()).unwrap();
    assert!(
        worker
            .print_frame(FrameIndex(1), 100_000, false, Vec::new())
            .is_err()
    );
    worker.abort();

    let snap = log.snapshot();
    assert!(snap.aborted);
    assert!(!snap.finished);
}

#[test]
fn dropping_the_worker_aborts_the_sink() {
    let sink = InMemorySink::new();
    let log = sink.log();
    let worker = ExportWorker::spawn(Box::new(sink)).unwrap();
    worker.begin(cfg(), BG).unwrap();
    drop(worker);
    assert!(log.snapshot().aborted);
}
