use super::*;

fn apply(m: &ColorMatrix, px: [u8; 4]) -> [u8; 4] {
    apply_chain(std::slice::from_ref(m), px)
}

fn apply_chain(chain: &[ColorMatrix], px: [u8; 4]) -> [u8; 4] {
    let mut s = Surface::from_premul(1, 1, px.to_vec()).unwrap();
    apply_color_chain(&mut s, chain);
    [s.data[0], s.data[1], s.data[2], s.data[3]]
}

#[test]
fn default_props_have_no_color_stages() {
    assert!(clip_color_chain(&KeyframeProps::default()).is_empty());
}

#[test]
fn chain_clamps_between_stages() {
    let props = KeyframeProps {
        brightness: 300.0,
        contrast: 50.0,
        ..KeyframeProps::default()
    };
    let chain = clip_color_chain(&props);
    assert_eq!(chain.len(), 2);

    // 0.502 * 3 saturates to 1.0 before contrast maps it to 0.75.
    let gray = [128, 128, 128, 255];
    assert_eq!(apply_chain(&chain, gray), [191, 191, 191, 255]);
    assert_eq!(
        apply_chain(&chain, gray),
        apply(&contrast(50.0), apply(&brightness(300.0), gray))
    );
}

#[test]
fn chain_runs_in_drawing_order() {
    let props = KeyframeProps {
        brightness: 0.0,
        invert: 100.0,
        ..KeyframeProps::default()
    };
    // brightness(0) first, then invert: white.
    let chain = clip_color_chain(&props);
    assert_eq!(apply_chain(&chain, [10, 20, 30, 255]), [255, 255, 255, 255]);
    let reversed: Vec<ColorMatrix> = chain.iter().rev().copied().collect();
    assert_eq!(apply_chain(&reversed, [10, 20, 30, 255]), [0, 0, 0, 255]);
}

#[test]
fn full_grayscale_equalizes_channels() {
    let out = apply(&grayscale(100.0), [255, 0, 0, 255]);
    assert_eq!(out[0], out[1]);
    assert_eq!(out[1], out[2]);
    assert_eq!(out[3], 255);
}

#[test]
fn invert_flips_channels() {
    assert_eq!(apply(&invert(100.0), [255, 0, 51, 255]), [0, 255, 204, 255]);
}

#[test]
fn opacity_scales_alpha_and_premul_rgb() {
    assert_eq!(apply(&opacity(50.0), [200, 100, 0, 255]), [100, 50, 0, 128]);
}

#[test]
fn transparent_pixels_are_untouched() {
    assert_eq!(apply(&invert(100.0), [0, 0, 0, 0]), [0, 0, 0, 0]);
}

#[test]
fn blur_constant_image_is_identity() {
    let px = [10u8, 20, 30, 40];
    let mut s = Surface::from_premul(4, 3, px.repeat(12)).unwrap();
    let before = s.clone();
    gaussian_blur(&mut s, 2.0).unwrap();
    assert_eq!(s, before);
}

#[test]
fn huge_sigma_is_bounded_by_the_surface() {
    let px = [10u8, 20, 30, 40];
    let mut s = Surface::from_premul(6, 4, px.repeat(24)).unwrap();
    let before = s.clone();
    gaussian_blur(&mut s, 5.0e9).unwrap();
    assert_eq!(s, before);

    let mut dot = Surface::new(5, 5);
    dot.data[48..52].copy_from_slice(&[255, 255, 255, 255]);
    gaussian_blur(&mut dot, 1.0e6).unwrap();
    assert!(dot.data[51] < 255);
    assert!(dot.data.chunks_exact(4).filter(|p| p[3] != 0).count() > 1);
}

#[test]
fn blur_spreads_energy_from_single_pixel() {
    let mut s = Surface::new(9, 9);
    let center = ((4 * 9 + 4) * 4) as usize;
    s.data[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);
    gaussian_blur(&mut s, 1.0).unwrap();

    let nonzero = s.data.chunks_exact(4).filter(|px| px[3] != 0).count();
    assert!(nonzero > 1);
    let sum_a: u32 = s.data.chunks_exact(4).map(|px| u32::from(px[3])).sum();
    assert!((sum_a as i32 - 255).abs() <= 8);
}

#[test]
fn drop_shadow_paints_offset_copy_under_layer() {
    let mut s = Surface::new(4, 4);
    s.data[0..4].copy_from_slice(&[255, 255, 255, 255]);
    let shadow = DropShadow {
        dx: 2.0,
        dy: 1.0,
        blur: 0.0,
        color: Color::BLACK,
    };
    drop_shadow(&mut s, &shadow).unwrap();
    assert_eq!(s.pixel(0, 0), Some([255, 255, 255, 255]));
    assert_eq!(s.pixel(2, 1), Some([0, 0, 0, 255]));
    assert_eq!(s.pixel(1, 1), Some([0, 0, 0, 0]));
}

#[test]
fn shadow_requires_visible_color() {
    assert!(DropShadow::from_props(&KeyframeProps::default()).is_none());
}

#[test]
fn over_blends_half_alpha() {
    let mut dst = vec![0u8, 0, 255, 255];
    premul_over_in_place(&mut dst, &[128, 0, 0, 128], 1.0).unwrap();
    assert_eq!(dst, vec![128, 0, 127, 255]);
}
