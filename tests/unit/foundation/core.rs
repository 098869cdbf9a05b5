use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn frame_timestamps_are_exactly_spaced() {
    let fps = Fps::whole(10).unwrap();
    let ts: Vec<i64> = (0..4).map(|f| fps.frame_timestamp_us(FrameIndex(f))).collect();
    assert_eq!(ts, vec![0, 100_000, 200_000, 300_000]);
    assert_eq!(fps.frame_time_ms(FrameIndex(3)), 300.0);
}

#[test]
fn frames_for_duration_covers_half_open_range() {
    let fps = Fps::whole(10).unwrap();
    assert_eq!(fps.frames_for_duration_ms(1000.0), 10);
    assert_eq!(fps.frames_for_duration_ms(1001.0), 11);
    assert_eq!(fps.frames_for_duration_ms(0.0), 0);

    let fps = Fps::whole(60).unwrap();
    assert_eq!(fps.frames_for_duration_ms(1000.0), 60);
}

#[test]
fn color_parses_hex_and_hsl() {
    let c: Color = serde_json::from_value(serde_json::json!("#ff000080")).unwrap();
    assert!((c.r - 1.0).abs() < 1e-9);
    assert!((c.a - 128.0 / 255.0).abs() < 1e-9);

    let c = Color::hsla(0.0, 1.0, 0.5, 1.0);
    assert!((c.r - 1.0).abs() < 1e-9);
    assert!(c.g.abs() < 1e-9);

    assert!(Color::parse_hex("#12").is_err());
}

#[test]
fn color_struct_form_roundtrips() {
    let c = Color::rgba(0.25, 0.5, 0.75, 0.9);
    let s = serde_json::to_string(&c).unwrap();
    let back: Color = serde_json::from_str(&s).unwrap();
    assert_eq!(back, c);
}

#[test]
fn premul_conversion_scales_rgb_by_alpha() {
    let c = Color::rgba(1.0, 0.0, 0.0, 0.5);
    assert_eq!(
        c.to_rgba8_premul(),
        Rgba8Premul {
            r: 128,
            g: 0,
            b: 0,
            a: 128
        }
    );
}
