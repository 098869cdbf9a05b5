use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ping {
    A,
    B,
}

impl EventName for Ping {
    const ALL: &'static [Self] = &[Ping::A, Ping::B];

    fn name(self) -> &'static str {
        match self {
            Ping::A => "PING_A",
            Ping::B => "PING_B",
        }
    }
}

#[test]
fn dropping_subscription_unsubscribes() {
    let emitter = Emitter::<Ping>::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = Arc::clone(&hits);
    let sub = emitter.subscribe(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });
    emitter.emit(Ping::A);
    assert_eq!(emitter.subscriber_count(), 1);

    drop(sub);
    emitter.emit(Ping::A);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(emitter.subscriber_count(), 0);
}

#[test]
fn subscribe_named_filters_and_rejects_unknown() {
    let emitter = Emitter::<Ping>::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    let _sub = emitter
        .subscribe_named("PING_B", move || {
            h.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    emitter.emit(Ping::A);
    emitter.emit(Ping::B);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let err = emitter.subscribe_named("PING_C", || {}).unwrap_err();
    assert!(matches!(err, CliplaneError::UnknownEvent(_)));
}

#[test]
fn reentrant_emit_does_not_deadlock() {
    let emitter = Arc::new(Emitter::<Ping>::new());
    let hits = Arc::new(AtomicUsize::new(0));

    let inner = Arc::clone(&emitter);
    let h = Arc::clone(&hits);
    let _sub = emitter.subscribe(move |e| {
        h.fetch_add(1, Ordering::SeqCst);
        if *e == Ping::A {
            inner.emit(Ping::B);
        }
    });

    emitter.emit(Ping::A);
    // The nested B emission skips the callback that is still running.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn forget_keeps_callback_alive() {
    let emitter = Emitter::<Ping>::new();
    emitter.subscribe(|_| {}).forget();
    assert_eq!(emitter.subscriber_count(), 1);
}
