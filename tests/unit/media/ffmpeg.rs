use super::*;

const REPORT: &str = r#"{
    "streams": [
        {"index": 0, "codec_type": "audio", "sample_rate": "48000"},
        {"index": 1, "codec_type": "video", "width": 640, "height": 360}
    ],
    "format": {"duration": "2.500000"}
}"#;

#[test]
fn probe_reads_the_video_stream_and_duration() {
    let probe = parse_probe(REPORT.as_bytes()).unwrap();
    assert_eq!(
        probe,
        VideoProbe {
            width: 640,
            height: 360,
            duration_ms: 2500.0,
        }
    );
}

#[test]
fn probe_without_video_or_duration_is_a_load_error() {
    let audio_only = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "1.0"}}"#;
    assert!(matches!(
        parse_probe(audio_only.as_bytes()).unwrap_err(),
        CliplaneError::Load(_)
    ));

    let still = r#"{"streams": [{"codec_type": "video", "width": 8, "height": 8}], "format": {"duration": "N/A"}}"#;
    assert!(matches!(
        parse_probe(still.as_bytes()).unwrap_err(),
        CliplaneError::Load(_)
    ));

    let empty = r#"{"streams": [{"codec_type": "video", "width": 0, "height": 8}], "format": {"duration": "1.0"}}"#;
    assert!(parse_probe(empty.as_bytes()).is_err());
    assert!(parse_probe(b"not json").is_err());
}

#[test]
fn frame_bytes_trims_to_one_frame() {
    assert_eq!(frame_bytes(vec![7; 20], 2, 2).unwrap(), vec![7; 16]);
    assert!(frame_bytes(vec![7; 15], 2, 2).is_err());
}

#[test]
fn pcm_is_little_endian_f32() {
    let mut bytes = Vec::new();
    for s in [0.5f32, -1.0] {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    assert_eq!(pcm_f32le(&bytes).unwrap(), vec![0.5, -1.0]);
    bytes.push(0);
    assert!(pcm_f32le(&bytes).is_err());
}

#[test]
fn missing_audio_stream_is_recognised() {
    assert!(lacks_audio_stream(
        "Stream map '0:a' matches no streams.\nOutput file #0 does not contain any stream"
    ));
    assert!(!lacks_audio_stream("Invalid data found when processing input"));
}
