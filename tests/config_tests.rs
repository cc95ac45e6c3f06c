//! Integration tests for the wsman configuration system
//!
//! These tests verify:
//! - Loading configuration from TOML, YAML, and JSON files
//! - Explicit config paths and `WSMAN_CONFIG`
//! - Environment variable overrides
//! - Turning a configuration into a client

use serial_test::serial;
use std::path::PathBuf;
use tempfile::tempdir;
use wsman::auth::AuthMode;
use wsman::config::Config;

const ENV_VARS: &[&str] = &[
    "WSMAN_CONFIG",
    "WSMAN_ENDPOINT",
    "WSMAN_USERNAME",
    "WSMAN_PASSWORD",
    "WSMAN_AUTH",
    "WSMAN_TIMEOUT",
    "WSMAN_VERIFY_TLS",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

// ============================================================================
// File Formats
// ============================================================================

#[test]
fn test_load_toml_config() {
    let toml_content = r#"
[endpoint]
url = "https://10.0.0.12/wsman"
username = "root"
password = "calvin"
auth = "digest"
timeout = 30
verify_tls = true
optimize_enumeration = false
max_pages = 50

[logging]
level = "debug"
format = "json"
"#;

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("wsman.toml");
    std::fs::write(&config_path, toml_content).unwrap();

    let config = Config::from_file(&config_path).unwrap();

    assert_eq!(config.endpoint.url.as_deref(), Some("https://10.0.0.12/wsman"));
    assert_eq!(config.endpoint.username.as_deref(), Some("root"));
    assert_eq!(config.endpoint.password.as_deref(), Some("calvin"));
    assert_eq!(config.endpoint.auth, AuthMode::Digest);
    assert_eq!(config.endpoint.timeout, 30);
    assert!(config.endpoint.verify_tls);
    assert!(!config.endpoint.optimize_enumeration);
    assert_eq!(config.endpoint.max_pages, 50);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_load_yaml_config() {
    let yaml_content = r#"
endpoint:
  url: http://bmc.example.com/wsman
  auth: none
"#;

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("wsman.yml");
    std::fs::write(&config_path, yaml_content).unwrap();

    let config = Config::from_file(&config_path).unwrap();

    assert_eq!(config.endpoint.url.as_deref(), Some("http://bmc.example.com/wsman"));
    assert_eq!(config.endpoint.auth, AuthMode::None);
    assert_eq!(config.endpoint.timeout, 10);
}

#[test]
fn test_load_json_config() {
    let json_content = r#"{"endpoint": {"url": "https://bmc/wsman", "timeout": 5}}"#;

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("wsman.json");
    std::fs::write(&config_path, json_content).unwrap();

    let config = Config::from_file(&config_path).unwrap();

    assert_eq!(config.endpoint.url.as_deref(), Some("https://bmc/wsman"));
    assert_eq!(config.endpoint.timeout, 5);
    assert_eq!(config.endpoint.auth, AuthMode::Basic);
}

#[test]
fn test_later_files_override_only_what_they_set() {
    let temp_dir = tempdir().unwrap();
    let system = temp_dir.path().join("system.toml");
    let user = temp_dir.path().join("user.toml");
    std::fs::write(
        &system,
        r#"
[endpoint]
url = "https://10.0.0.12/wsman"
auth = "digest"
verify_tls = true
optimize_enumeration = false
timeout = 30

[logging]
level = "debug"
"#,
    )
    .unwrap();
    std::fs::write(
        &user,
        r#"
[endpoint]
auth = "basic"
verify_tls = false
optimize_enumeration = true
"#,
    )
    .unwrap();

    let config = Config::from_files([&system, &user]).unwrap();

    assert_eq!(config.endpoint.url.as_deref(), Some("https://10.0.0.12/wsman"));
    assert_eq!(config.endpoint.auth, AuthMode::Basic);
    assert!(!config.endpoint.verify_tls);
    assert!(config.endpoint.optimize_enumeration);
    assert_eq!(config.endpoint.timeout, 30);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_invalid_config_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("wsman.toml");
    std::fs::write(&config_path, "[endpoint]\nauth = \"kerberos\"\n").unwrap();

    assert!(Config::from_file(&config_path).is_err());
}

// ============================================================================
// Loading and Environment Overrides
// ============================================================================

#[test]
#[serial]
fn test_explicit_missing_config_is_an_error() {
    clear_env();
    let missing = PathBuf::from("/nonexistent/wsman.toml");

    let err = Config::load(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
#[serial]
fn test_wsman_config_env_selects_file() {
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("custom.toml");
    std::fs::write(&config_path, "[endpoint]\nurl = \"https://from-env/wsman\"\n").unwrap();

    std::env::set_var("WSMAN_CONFIG", &config_path);
    let config = Config::load(None);
    std::env::remove_var("WSMAN_CONFIG");

    assert_eq!(
        config.unwrap().endpoint.url.as_deref(),
        Some("https://from-env/wsman")
    );
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("wsman.toml");
    std::fs::write(
        &config_path,
        "[endpoint]\nurl = \"https://file/wsman\"\nusername = \"file-user\"\ntimeout = 20\n",
    )
    .unwrap();

    std::env::set_var("WSMAN_ENDPOINT", "https://env/wsman");
    std::env::set_var("WSMAN_AUTH", "Digest");
    std::env::set_var("WSMAN_TIMEOUT", "45");
    std::env::set_var("WSMAN_VERIFY_TLS", "yes");
    let config = Config::load(Some(&config_path)).unwrap();
    clear_env();

    assert_eq!(config.endpoint.url.as_deref(), Some("https://env/wsman"));
    assert_eq!(config.endpoint.username.as_deref(), Some("file-user"));
    assert_eq!(config.endpoint.auth, AuthMode::Digest);
    assert_eq!(config.endpoint.timeout, 45);
    assert!(config.endpoint.verify_tls);
}

#[test]
#[serial]
fn test_unparseable_env_values_are_ignored() {
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("wsman.toml");
    std::fs::write(&config_path, "[endpoint]\ntimeout = 20\n").unwrap();

    std::env::set_var("WSMAN_TIMEOUT", "soon");
    std::env::set_var("WSMAN_AUTH", "ntlm");
    let config = Config::load(Some(&config_path)).unwrap();
    clear_env();

    assert_eq!(config.endpoint.timeout, 20);
    assert_eq!(config.endpoint.auth, AuthMode::Basic);
}

// ============================================================================
// Client Construction
// ============================================================================

#[test]
fn test_client_builder_from_config() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("wsman.toml");
    std::fs::write(
        &config_path,
        "[endpoint]\nurl = \"https://10.0.0.12/wsman\"\nusername = \"root\"\npassword = \"calvin\"\nauth = \"digest\"\noptimize_enumeration = false\n",
    )
    .unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let client = config.client_builder().unwrap().build().unwrap();

    assert_eq!(client.endpoint(), "https://10.0.0.12/wsman");
    assert_eq!(client.auth_mode(), AuthMode::Digest);
    assert!(!client.optimize_enumeration());
}

#[test]
fn test_digest_without_password_fails_to_build() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("wsman.toml");
    std::fs::write(
        &config_path,
        "[endpoint]\nurl = \"https://10.0.0.12/wsman\"\nusername = \"root\"\nauth = \"digest\"\n",
    )
    .unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let err = config.client_builder().unwrap().build().unwrap_err();

    assert_eq!(err.kind(), wsman::ErrorKind::Auth);
}

#[test]
fn test_bad_scheme_fails_to_build() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("wsman.toml");
    std::fs::write(&config_path, "[endpoint]\nurl = \"ftp://bmc/wsman\"\n").unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let err = config.client_builder().unwrap().build().unwrap_err();

    assert_eq!(err.kind(), wsman::ErrorKind::Argument);
}
