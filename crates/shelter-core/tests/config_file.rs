//! Loading configuration from disk.

use std::io::Write;

use shelter_core::{CoreError, DetectionPolicy, ShelterConfig};

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[detector]
policy = "fixed_threshold"
window_size = 30
min_history = 10

[detector.thresholds]
humidity_min = 25.0

[scorer]
precision = 3
"#
    )
    .unwrap();

    let config = ShelterConfig::load(file.path()).unwrap();
    assert_eq!(config.detector.policy, DetectionPolicy::FixedThreshold);
    assert_eq!(config.detector.window_size, 30);
    assert_eq!(config.detector.min_history, 10);
    assert_eq!(config.detector.thresholds.humidity_min, 25.0);
    assert_eq!(config.detector.thresholds.temperature_max, 30.0);
    assert_eq!(config.scorer.precision, 3);
    assert_eq!(config.scorer.completion_weight, 0.7);
}

#[test]
fn written_config_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shelter.toml");
    let config = ShelterConfig::default();
    std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
    assert_eq!(ShelterConfig::load(&path).unwrap(), config);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ShelterConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, CoreError::Io(_)));
}

#[test]
fn malformed_file_is_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[detector\nwindow_size = ").unwrap();
    let err = ShelterConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigParse(_)));
}

#[test]
fn min_history_above_window_is_rejected() {
    let err = ShelterConfig::from_toml_str(
        r#"
[detector]
window_size = 4
min_history = 5
"#,
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidConfig(_)));
}

#[test]
fn unknown_policy_is_parse_error() {
    let err = ShelterConfig::from_toml_str("[detector]\npolicy = \"magic\"\n").unwrap_err();
    assert!(matches!(err, CoreError::ConfigParse(_)));
}
