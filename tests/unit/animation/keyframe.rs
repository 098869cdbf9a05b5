use super::*;

fn kf(time_point: f64, duration: f64) -> Keyframe {
    Keyframe {
        time_point,
        duration,
        ..Keyframe::base(KeyframeProps::default())
    }
}

#[test]
fn interval_must_stay_inside_percent_range() {
    let list = vec![kf(0.0, 0.0)];
    assert!(interval_fits(&list, None, 10.0, 90.0));
    assert!(!interval_fits(&list, None, 10.0, 91.0));
    assert!(!interval_fits(&list, None, -1.0, 5.0));
}

#[test]
fn interval_rejects_overlap_and_shared_start() {
    let list = vec![kf(0.0, 0.0), kf(20.0, 30.0)];
    assert!(!interval_fits(&list, None, 40.0, 5.0));
    assert!(!interval_fits(&list, None, 10.0, 15.0));
    assert!(!interval_fits(&list, None, 20.0, 0.0));
    assert!(interval_fits(&list, None, 50.0, 10.0));
    assert!(interval_fits(&list, None, 10.0, 10.0));
    // Moving the keyframe at index 1 ignores its own interval.
    assert!(interval_fits(&list, Some(1), 25.0, 30.0));
}

#[test]
fn offset_by_adds_fields() {
    let base = KeyframeProps::for_source(640, 360);
    let delta = KeyframeProps {
        output_x: 10.0,
        output_width: -40.0,
        ..KeyframeProps::zero()
    };
    let out = base.offset_by(&delta);
    assert_eq!(out.output_x, 10.0);
    assert_eq!(out.output_width, 200.0);
    assert_eq!(out.crop_image_w, 640.0);
    assert_eq!(out.brightness, 100.0);
}

#[test]
fn lerp_midpoint() {
    let a = KeyframeProps::default();
    let b = KeyframeProps {
        opacity: 0.0,
        output_x: 100.0,
        ..a
    };
    let mid = KeyframeProps::lerp(&a, &b, 0.5);
    assert_eq!(mid.opacity, 50.0);
    assert_eq!(mid.output_x, 50.0);
}

#[test]
fn keyframe_json_uses_flat_camel_case() {
    let k = kf(10.0, 5.0);
    let v = serde_json::to_value(&k).unwrap();
    assert_eq!(v["type"], "absolute");
    assert_eq!(v["timePoint"], 10.0);
    assert_eq!(v["timeAnimation"], 5.0);
    assert_eq!(v["outputWidth"], 240.0);
    assert_eq!(v["ease"], "none");

    let back: Keyframe = serde_json::from_value(v).unwrap();
    assert_eq!(back, k);
}
