//! Integration tests for logging system

use bridge_traits::LogLevel;
use core_runtime::logging::{summarize_payload, LogFormat, LoggingConfig, MAX_LOGGED_STRING};
use serde_json::json;

#[test]
fn test_logging_configuration() {
    // Logging can only be initialized once per process, so only the builder
    // is exercised here.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Trace);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Trace);
    assert!(config.display_target);
}

#[test]
fn test_recording_payload_is_summarized() {
    let recording = "UklGR".repeat(10_000);
    let summary = summarize_payload(&json!({ "data": recording }));
    assert!(summary.len() < 100);
    assert!(summary.contains("50000 bytes"));
}

#[test]
fn test_string_at_limit_is_kept() {
    let text = "x".repeat(MAX_LOGGED_STRING);
    assert_eq!(summarize_payload(&json!(text)), format!("\"{}\"", text));
}

#[test]
fn test_long_arrays_are_counted() {
    let ids: Vec<u32> = (0..20).collect();
    assert_eq!(summarize_payload(&json!(ids)), "<array, 20 items>");
    assert_eq!(summarize_payload(&json!([1, 2])), "[1,2]");
}
