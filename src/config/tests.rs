use crate::config::config::{Config, ConfigError};

/// Parse a TOML string into a `Config` and run validation.
fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    Config::from_toml_str(toml_str)
}

#[test]
fn test_basic_config() {
    let toml = r#"
        [app]
        id = "viewer-test"
        log_level = "debug"

        [hosting]
        application_name = "viewer"
        preferred_transfer_syntaxes = ["1.2.840.10008.1.2.1", "1.2.840.10008.1.2"]

        [storage]
        backend = "filesystem"

        [storage.options]
        path = "./tmp/test"

        [local]
        data_dir = "/srv/dicom"
        secondary_capture = true

        [local.screen]
        x = 10
        y = 20
        width = 800
        height = 600
    "#;

    let config = load_config_from_str(toml).expect("Configuration should parse and validate");

    assert_eq!(config.app.id, "viewer-test");
    assert_eq!(config.hosting.application_name, "viewer");
    assert_eq!(config.hosting.preferred_transfer_syntaxes.len(), 2);
    assert_eq!(config.local.data_dir.to_str(), Some("/srv/dicom"));
    assert!(config.local.secondary_capture);
    assert!(config.local.load_data);
    assert_eq!(config.local.screen.map(|r| r.width), Some(800));
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = load_config_from_str("").expect("defaults are valid");
    assert_eq!(config.app.id, "dah");
    assert_eq!(config.app.log_level, "info");
    assert!(!config.logging.log_to_file);
    assert_eq!(config.storage.backend, "filesystem");
    assert_eq!(config.hosting.host_call_timeout_ms, 10_000);
}

#[test]
fn test_invalid_log_level() {
    let err = load_config_from_str("[app]\nlog_level = \"loud\"").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLogLevel(_)));
}

#[test]
fn test_file_logging_needs_path() {
    let err = load_config_from_str("[logging]\nlog_to_file = true").unwrap_err();
    assert!(matches!(err, ConfigError::MissingLogFilePath));
}

#[test]
fn test_invalid_transfer_syntax_is_rejected() {
    let err = load_config_from_str("[hosting]\npreferred_transfer_syntaxes = [\"abc\"]").unwrap_err();
    assert!(matches!(err, ConfigError::Hosting(_)));
}
