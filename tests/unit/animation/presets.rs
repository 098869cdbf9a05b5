use super::*;

#[test]
fn names_roundtrip_through_parse() {
    for p in TransitionPreset::ALL {
        assert_eq!(TransitionPreset::parse(p.name()).unwrap(), p);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, format!("\"{}\"", p.name()));
    }
    assert!(TransitionPreset::parse("SPIN").is_err());
}

#[test]
fn none_preset_has_no_effect() {
    let base = KeyframeProps::for_source(100, 100);
    assert_eq!(TransitionPreset::None.apply(&base), base);
    assert!(TransitionPreset::None.ease().is_none());
    assert!(!Transition::new(TransitionPreset::None, 500.0).is_active());
}

#[test]
fn crop_in_extends_scale_in() {
    let base = KeyframeProps::for_source(100, 80);
    let scale = TransitionPreset::ScaleIn.apply(&base);
    let crop = TransitionPreset::CropIn.apply(&base);
    assert_eq!(scale.crop_image_w, 100.0);
    assert_eq!(crop.crop_image_w, 0.0);
    assert_eq!(crop.output_width, scale.output_width);
    assert_eq!(crop.opacity, 0.0);
}

#[test]
fn bounce_presets_move_output_origin() {
    let base = KeyframeProps::default();
    assert_eq!(TransitionPreset::BounceDown.apply(&base).output_y, -400.0);
    assert_eq!(TransitionPreset::BounceLeft.apply(&base).output_x, 400.0);
    assert_eq!(
        TransitionPreset::BounceUp.ease().map(|e| e.curve),
        Some(EaseCurve::Bounce)
    );
}
