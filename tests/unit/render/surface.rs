use super::*;

#[test]
fn from_premul_checks_length() {
    assert!(Surface::from_premul(2, 2, vec![0; 16]).is_ok());
    assert!(Surface::from_premul(2, 2, vec![0; 15]).is_err());
}

#[test]
fn straight_input_is_premultiplied() {
    let s = Surface::from_straight(1, 1, vec![200, 100, 50, 128]).unwrap();
    assert_eq!(s.pixel(0, 0), Some([100, 50, 25, 128]));
    assert_eq!(s.pixel(1, 0), None);
}

#[test]
fn png_export_unpremultiplies() {
    let s = Surface::from_premul(1, 1, vec![100, 50, 25, 128]).unwrap();
    let img = s.to_rgba_image().unwrap();
    let px = img.get_pixel(0, 0).0;
    assert!((i32::from(px[0]) - 199).abs() <= 1);
    assert_eq!(px[3], 128);
}

#[test]
fn fill_writes_every_pixel() {
    let c = Rgba8Premul {
        r: 1,
        g: 2,
        b: 3,
        a: 255,
    };
    let s = Surface::filled(3, 2, c);
    assert!(s.data.chunks_exact(4).all(|px| px == [1, 2, 3, 255]));
}
