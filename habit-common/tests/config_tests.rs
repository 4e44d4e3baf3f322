//! Integration tests for configuration loading and graceful degradation
//!
//! - Missing TOML files SHALL NOT cause termination
//! - Present but malformed TOML files are reported as configuration errors
//! - Overrides (CLI / environment) take priority over the file

use habit_common::config::{ConfigOrigin, ConfigOverrides, TomlConfig};
use habit_common::Error;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let (config, origin) = TomlConfig::load(Some(&path)).expect("missing file should not fail");

    assert_eq!(origin, ConfigOrigin::Missing(path.clone()));
    assert!(origin.is_defaults());

    assert_eq!(config.server.port, 8000);
    assert_eq!(config.database.table, "habit_events");
    assert!(config.database.url.is_none());
}

#[test]
fn test_full_file_is_loaded() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
host = "0.0.0.0"
port = 8080
frontend_url = "http://dashboard.local"
cors_origins = ["http://dashboard.local"]

[logging]
level = "debug"

[sources]
default_source = "supabase"

[sheets]
sheet_id = "abc123"
timeout_secs = 5

[database]
url = "postgres://user:pw@db.example.com:5432/postgres"
table = "events"

[calendar]
enabled = false
token_file = "/tmp/token.json"
"#
    )
    .unwrap();

    let (config, origin) = TomlConfig::load(Some(file.path())).unwrap();

    assert_eq!(origin, ConfigOrigin::File(file.path().to_path_buf()));

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.cors_origins, vec!["http://dashboard.local"]);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.sources.default_source.as_deref(), Some("supabase"));
    assert_eq!(config.sheets.sheet_id.as_deref(), Some("abc123"));
    assert_eq!(config.sheets.timeout_secs, 5);
    // Unspecified fields in a present section keep their defaults
    assert_eq!(config.sheets.probe_timeout_secs, 10);
    assert_eq!(config.database.table, "events");
    assert_eq!(config.database.acquire_timeout_secs, 5);
    assert!(!config.calendar.enabled);
    assert_eq!(config.calendar.token_file.to_string_lossy(), "/tmp/token.json");
}

#[test]
fn test_malformed_file_is_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[server\nport = ").unwrap();

    let result = TomlConfig::load(Some(file.path()));

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_wrong_type_is_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[server]\nport = \"eighty\"").unwrap();

    assert!(TomlConfig::load(Some(file.path())).is_err());
}

#[test]
fn test_overrides_take_priority_over_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[server]\nport = 8080\n[sheets]\nsheet_id = \"from-file\"\n[database]\ntable = \"file_table\""
    )
    .unwrap();

    let config = TomlConfig::load(Some(file.path()))
        .unwrap()
        .0
        .apply_overrides(ConfigOverrides {
            port: Some(9999),
            sheet_id: Some("from-cli".to_string()),
            database_url: Some("postgres://localhost/habits".to_string()),
            log_level: Some("trace".to_string()),
            ..Default::default()
        });

    assert_eq!(config.server.port, 9999);
    assert_eq!(config.sheets.sheet_id.as_deref(), Some("from-cli"));
    assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/habits"));
    assert_eq!(config.database.table, "file_table");
    assert_eq!(config.logging.level, "trace");
}
