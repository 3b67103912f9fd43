// tests/config_loading.rs

use std::io::Write;

use serde_json::json;
use tempfile::NamedTempFile;

use packflow::config::{load_and_validate_app, load_tool_settings};
use packflow::errors::PackflowError;

#[test]
fn app_config_gets_an_empty_modules_mapping() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"name": "My App", "uuid": "abc"}}"#).unwrap();

    let tree = load_and_validate_app(file.path()).unwrap();
    assert_eq!(tree["modules"], json!({}));
    assert_eq!(tree["name"], json!("My App"));
}

#[test]
fn app_config_without_uuid_is_a_configuration_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"name": "My App", "modules": {{}}}}"#).unwrap();

    match load_and_validate_app(file.path()) {
        Err(PackflowError::Configuration(msg)) => assert!(msg.contains("uuid")),
        other => panic!("Expected Configuration error, got: {other:?}"),
    }
}

#[test]
fn malformed_json_is_reported_as_json_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();

    assert!(matches!(
        load_and_validate_app(file.path()),
        Err(PackflowError::Json(_))
    ));
}

#[test]
fn missing_tool_settings_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local_config.toml");

    let settings = load_tool_settings(&path).unwrap();
    assert_eq!(settings.file.supervisor.probe_retries, 3);
    assert!(settings.file.android.sdk.is_none());
    assert_eq!(settings.path(), Some(path.as_path()));
}

#[test]
fn tool_settings_survive_set_and_save() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[supervisor]
probe_retries = 5

[custom]
keep = "me"
"#
    )
    .unwrap();

    let mut settings = load_tool_settings(file.path()).unwrap();
    assert_eq!(settings.file.supervisor.probe_retries, 5);
    assert_eq!(settings.file.supervisor.poll_interval_ms, 1000);

    settings
        .set_and_save("android.sdk", toml::Value::String("/opt/android-sdk".into()))
        .unwrap();

    let reloaded = load_tool_settings(file.path()).unwrap();
    assert_eq!(reloaded.get_str("android.sdk"), Some("/opt/android-sdk"));
    assert_eq!(reloaded.get_str("custom.keep"), Some("me"));
    assert_eq!(
        reloaded.file.android.sdk.as_deref(),
        Some(std::path::Path::new("/opt/android-sdk"))
    );
}
