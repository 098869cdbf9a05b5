use super::*;

#[test]
fn ticks_only_advance_while_playing() {
    let mut c = Clock::new(5);
    c.tick();
    assert_eq!(c.elapsed(), 0);

    c.play();
    c.play();
    for _ in 0..4 {
        c.tick();
    }
    assert_eq!(c.elapsed(), 20);

    c.pause();
    c.tick();
    assert_eq!(c.elapsed(), 20);
    assert_eq!(c.state(), ClockState::Stopped);
}

#[test]
fn seek_sets_time_in_any_state() {
    let mut c = Clock::default();
    c.seek(1234);
    assert_eq!(c.elapsed(), 1234);
    c.play();
    c.seek(10);
    c.tick();
    assert_eq!(c.elapsed(), 10 + DEFAULT_TICK_MS);
}

#[test]
fn zero_interval_is_bumped() {
    assert_eq!(Clock::new(0).tick_interval_ms(), 1);
}

#[test]
fn interval_fires_once_per_period_without_catch_up() {
    let t0 = Instant::now();
    let mut iv = Interval::new(Duration::from_millis(10));

    assert!(iv.poll(t0));
    assert!(!iv.poll(t0 + Duration::from_millis(9)));
    assert!(iv.poll(t0 + Duration::from_millis(10)));

    // 50ms late: one fire, then the next deadline is 10ms after that.
    let late = t0 + Duration::from_millis(70);
    assert!(iv.poll(late));
    assert!(!iv.poll(late + Duration::from_millis(5)));
    assert_eq!(
        iv.remaining(late + Duration::from_millis(5)),
        Duration::from_millis(5)
    );
}
