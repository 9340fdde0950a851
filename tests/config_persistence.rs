//! Integration tests for settings files

use dirvis_rs::config::AppConfig;
use dirvis_rs::DirVisError;

fn customized() -> AppConfig {
    let mut config = AppConfig::default();
    config.network.idle_wait_ms = 25;
    config.network.start_on_launch = false;
    config.commands.queue_capacity = 4;
    config.logging.filter = "debug".to_string();
    config.frames.frame_count = 3;
    config
}

#[test]
fn test_json_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let config = customized();

    config.save_to(&path).unwrap();
    assert_eq!(AppConfig::load_from(&path).unwrap(), config);
}

#[test]
fn test_toml_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    let config = customized();

    config.save_to(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("[network]"));
    assert_eq!(AppConfig::load_from(&path).unwrap(), config);
}

#[test]
fn test_missing_file_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = AppConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, DirVisError::WithContext { .. }));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_malformed_file_is_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ network: ").unwrap();

    match AppConfig::load_from(&path).unwrap_err() {
        DirVisError::WithContext { source, .. } => {
            assert!(matches!(*source, DirVisError::Serialization(_)))
        }
        other => panic!("unexpected error: {other}"),
    }
}
