use super::*;

#[test]
fn defaults_fill_missing_fields() {
    let opts = StreamOpts::from_json_str("{}").unwrap();
    assert_eq!(opts, StreamOpts::default());
    assert_eq!(opts.buffer_bytes, DEFAULT_BUFFER_BYTES);
    assert!(opts.error_page);
    assert!(opts.slot_timeout().is_none());
}

#[test]
fn parses_and_validates() {
    let opts = StreamOpts::from_json_str(r#"{ "buffer_bytes": 512, "slot_timeout_ms": 250 }"#)
        .unwrap();
    assert_eq!(opts.buffer_bytes, 512);
    assert_eq!(opts.slot_timeout(), Some(Duration::from_millis(250)));

    let zero = StreamOpts::from_json_str(r#"{ "buffer_bytes": 0 }"#).unwrap_err();
    assert!(matches!(zero, SluiceError::Config(_)));
    let zero_timeout = StreamOpts::from_json_str(r#"{ "slot_timeout_ms": 0 }"#).unwrap_err();
    assert!(matches!(zero_timeout, SluiceError::Config(_)));
}

#[test]
fn unknown_fields_are_rejected() {
    let err = StreamOpts::from_json_str(r#"{ "bufer_bytes": 10 }"#).unwrap_err();
    assert!(matches!(err, SluiceError::Serde(_)));
}

#[test]
fn missing_file_is_a_config_error() {
    let err = StreamOpts::from_path("definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("config error:"));
}
