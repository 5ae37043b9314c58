use crate::config::*;
use crate::error::{TagsortError, TagsortExpectedError};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_minimal() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "").unwrap();

    let config = Config::parse(Some(&config_path)).unwrap();
    assert_eq!(config.log_output, "stderr");
    assert_eq!(config.max_filename_bytes, 180);
    assert_eq!(config.catalog, CatalogConfig::default());
    assert_eq!(config.catalog.pacing, Duration::from_millis(100));
    assert_eq!(config.normalize.filler_phrases, vec!["various artists", "various"]);
}

#[test]
fn test_config_full() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
        log_output = "file"
        max_filename_bytes = 255

        [normalize]
        filler_phrases = ["remastered"]
        noise_patterns = ['(?i)\bbonus\b']

        [catalog]
        base_url = "http://localhost:5000/ws/2"
        user_agent = "tagsort-test/1.0 ( test@example.com )"
        pacing_ms = 1000
        max_retries = 5
        "#,
    )
    .unwrap();

    let config = Config::parse(Some(&config_path)).unwrap();
    assert_eq!(config.log_output, "file");
    assert_eq!(config.max_filename_bytes, 255);
    assert_eq!(config.normalize.filler_phrases, vec!["remastered"]);
    assert_eq!(config.normalize.noise_patterns.len(), 1);
    assert_eq!(config.normalize.noise_patterns[0].as_str(), r"(?i)\bbonus\b");
    assert_eq!(
        config.catalog,
        CatalogConfig {
            base_url: "http://localhost:5000/ws/2".to_string(),
            user_agent: "tagsort-test/1.0 ( test@example.com )".to_string(),
            pacing: Duration::from_millis(1000),
            max_retries: 5,
        }
    );
    assert_eq!(crate::normalize::normalize_with(&config.normalize, "Album BONUS remastered"), "Album");
}

#[test]
fn test_config_partial_normalize_section_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[normalize]\nfiller_phrases = []\n").unwrap();

    let config = Config::parse(Some(&config_path)).unwrap();
    assert!(config.normalize.filler_phrases.is_empty());
    assert_eq!(config.normalize.noise_patterns.len(), crate::normalize::DEFAULT_NOISE_PATTERNS.len());
}

#[test]
fn test_config_unknown_keys_are_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
        music_dir = "~/music"
        [catalog]
        pacing_ms = 250
        colour = "red"
        [extra.nested]
        key = 1
        "#,
    )
    .unwrap();

    let config = Config::parse(Some(&config_path)).unwrap();
    assert_eq!(config.catalog.pacing, Duration::from_millis(250));
}

#[test]
fn test_config_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("missing.toml");

    let err = Config::parse(Some(&config_path)).unwrap_err();
    assert!(matches!(err, TagsortError::Expected(TagsortExpectedError::ConfigNotFound { ref path }) if *path == config_path));
    assert!(err.is_fatal());
}

#[test]
fn test_config_path_expands_tilde() {
    let home = directories::BaseDirs::new().unwrap().home_dir().to_path_buf();
    let err = Config::parse(Some(Path::new("~/.tagsort-definitely-missing.toml"))).unwrap_err();
    assert!(matches!(
        err,
        TagsortError::Expected(TagsortExpectedError::ConfigNotFound { ref path }) if *path == home.join(".tagsort-definitely-missing.toml")
    ));
}

#[test]
fn test_config_decode_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "this is not = = toml").unwrap();

    let err = Config::parse(Some(&config_path)).unwrap_err();
    assert!(matches!(err, TagsortError::Expected(TagsortExpectedError::ConfigDecode { .. })));
}

#[test]
fn test_config_invalid_values() {
    let cases = [
        ("log_output = \"syslog\"", "log_output"),
        ("max_filename_bytes = 3", "max_filename_bytes"),
        ("[catalog]\nuser_agent = \"  \"", "catalog.user_agent"),
        ("[catalog]\nbase_url = \"ftp://example.com\"", "catalog.base_url"),
        ("[catalog]\npacing_ms = -1", "catalog.pacing_ms"),
        ("[catalog]\nmax_retries = \"three\"", "catalog.max_retries"),
        ("[normalize]\nnoise_patterns = ['(unclosed']", "normalize"),
        ("normalize = 3", "normalize"),
    ];
    for (contents, expected_key) in cases {
        let err = Config::parse_str(Path::new("/etc/tagsort.toml"), contents).unwrap_err();
        match err {
            TagsortError::Expected(TagsortExpectedError::InvalidConfigValue { ref key, .. }) => {
                assert_eq!(key, expected_key, "for {contents:?}")
            }
            other => panic!("expected an invalid value error for {contents:?}, got {other}"),
        }
    }
}
