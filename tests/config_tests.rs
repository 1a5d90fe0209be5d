use kerio_api::config::{Config, Credentials, KerioConfig};
use kerio_api::{Component, ProductVariant};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_new_with_valid_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    let config_content = r#"
[kerio]
hostname = "mail.example.com"
username = "admin"
password = "secret"
product = "operator"
client_mode = true
no_tls = true
verify_ssl = false
timeout_secs = 15
"#;

    fs::write(&config_path, config_content).unwrap();

    let original_dir = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let result = Config::new();

    std::env::set_current_dir(original_dir).unwrap();

    assert!(result.is_ok());
    let config = result.unwrap();
    assert_eq!(config.kerio.hostname, "mail.example.com");
    assert_eq!(config.kerio.username, "admin");
    assert_eq!(config.kerio.password, "secret");
    assert_eq!(config.kerio.product, ProductVariant::Operator);
    assert_eq!(config.kerio.component(), Component::Client);
    assert!(config.kerio.no_tls);
    assert!(!config.kerio.verify_ssl);
    assert_eq!(config.kerio.timeout_secs, Some(15));
    assert_eq!(config.kerio.api_url, None);
}

#[test]
fn test_config_defaults() {
    let config = Config::parse(
        r#"
[kerio]
hostname = "mail.example.com"
username = "admin"
password = "secret"
"#,
    )
    .unwrap();

    assert_eq!(config.kerio.product, ProductVariant::Connect);
    assert_eq!(config.kerio.component(), Component::Admin);
    assert!(!config.kerio.no_tls);
    assert!(config.kerio.verify_ssl);
    assert_eq!(config.kerio.timeout_secs, None);
}

#[test]
fn test_config_from_path_with_missing_file() {
    let dir = tempdir().unwrap();
    let result = Config::from_path(dir.path().join("missing.toml"));
    assert!(result.is_err());
}

#[test]
fn test_config_with_invalid_toml() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    let invalid_content = r#"
[kerio
hostname = "mail.example.com"
"#;

    fs::write(&config_path, invalid_content).unwrap();

    assert!(Config::from_path(&config_path).is_err());
}

#[test]
fn test_config_with_unknown_product() {
    let result = Config::parse(
        r#"
[kerio]
hostname = "mail.example.com"
product = "workspace"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_config_without_kerio_section() {
    assert!(Config::parse("[server]\nusername = \"x\"\n").is_err());
}

#[test]
fn test_debug_output_redacts_password() {
    let config = KerioConfig::new("mail.example.com", "admin", "hunter2");
    let rendered = format!("{:?}", config);
    assert!(rendered.contains("admin"));
    assert!(!rendered.contains("hunter2"));

    let credentials = Credentials::new("admin", "hunter2");
    assert!(!format!("{:?}", credentials).contains("hunter2"));
}

#[test]
fn test_config_clone() {
    let config = Config::from(KerioConfig::new("mail.example.com", "admin", "secret"));

    let cloned = config.clone();
    assert_eq!(config.kerio.hostname, cloned.kerio.hostname);
    assert_eq!(config.kerio.credentials(), cloned.kerio.credentials());
}
