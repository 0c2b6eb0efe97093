mod common;

use std::path::PathBuf;
use std::time::Duration;

use common::TempDir;
use warden::config::{ConfigError, MAX_THREADS, ServerConfig};

#[test]
fn test_config_key_value_format() {
    let cfg = ServerConfig::parse(
        "# server settings\n\
         THREADS=4\n\
         \n\
         PORT=8443\n\
         HOME=/srv/www\n",
    )
    .unwrap();

    assert_eq!(cfg.threads, 4);
    assert_eq!(cfg.port, 8443);
    assert_eq!(cfg.home, PathBuf::from("/srv/www"));
}

#[test]
fn test_config_defaults() {
    let cfg = ServerConfig::parse("THREADS=1\nPORT=443\nHOME=www\n").unwrap();

    assert_eq!(cfg.cert, PathBuf::from("cert.pem"));
    assert_eq!(cfg.key, PathBuf::from("key.pem"));
    assert_eq!(cfg.max_request_bytes, 1024 * 1024);
    assert_eq!(cfg.idle_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.handshake_timeout(), Duration::from_secs(10));
}

#[test]
fn test_config_optional_keys_and_spacing() {
    let cfg = ServerConfig::parse(
        " THREADS = 2 \n\
         PORT=8443\n\
         HOME=/srv/www\n\
         CERT=/etc/warden/cert.pem\n\
         KEY=/etc/warden/key.pem\n\
         MAX_REQUEST_BYTES=2048\n\
         IDLE_TIMEOUT=5\n",
    )
    .unwrap();

    assert_eq!(cfg.threads, 2);
    assert_eq!(cfg.cert, PathBuf::from("/etc/warden/cert.pem"));
    assert_eq!(cfg.session().max_request_bytes, 2048);
    assert_eq!(cfg.session().idle_timeout, Duration::from_secs(5));
}

#[test]
fn test_config_numeric_home_stays_a_path() {
    let cfg = ServerConfig::parse("THREADS=1\nPORT=1\nHOME=2024\n").unwrap();
    assert_eq!(cfg.home, PathBuf::from("2024"));
}

#[test]
fn test_config_missing_required_key() {
    let err = ServerConfig::parse("THREADS=4\nPORT=8443\n").unwrap_err();

    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("home"));
}

#[test]
fn test_config_unknown_key_is_rejected() {
    let err = ServerConfig::parse("THREADS=4\nPORT=8443\nHOME=/srv\nCOLOR=blue\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_config_line_without_equals() {
    let err = ServerConfig::parse("THREADS=4\nPORT 8443\n").unwrap_err();
    assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
}

#[test]
fn test_config_zero_threads() {
    let err = ServerConfig::parse("THREADS=0\nPORT=8443\nHOME=/srv\n").unwrap_err();
    assert!(matches!(err, ConfigError::Zero("threads")));
}

#[test]
fn test_config_thread_count_is_bounded() {
    let at_limit = format!("THREADS={MAX_THREADS}\nPORT=8443\nHOME=/srv\n");
    assert_eq!(ServerConfig::parse(&at_limit).unwrap().threads, MAX_THREADS);

    let above = format!("THREADS={}\nPORT=8443\nHOME=/srv\n", MAX_THREADS + 1);
    assert!(matches!(
        ServerConfig::parse(&above).unwrap_err(),
        ConfigError::TooLarge { key: "threads", .. }
    ));

    let huge = format!("THREADS={}\nPORT=8443\nHOME=/srv\n", usize::MAX);
    assert!(ServerConfig::parse(&huge).is_err());
}

#[test]
fn test_config_bad_port() {
    let err = ServerConfig::parse("THREADS=1\nPORT=99999\nHOME=/srv\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_config_load_from_files() {
    let dir = TempDir::new();
    dir.write("config.txt", b"THREADS=3\nPORT=8443\nHOME=/srv/www\n");
    dir.write(
        "config.yaml",
        b"threads: 3\nport: 8443\nhome: /srv/www\nidle_timeout: 12\n",
    );

    let txt = ServerConfig::load(dir.path().join("config.txt")).unwrap();
    let yaml = ServerConfig::load(dir.path().join("config.yaml")).unwrap();

    assert_eq!(txt.threads, yaml.threads);
    assert_eq!(txt.home, yaml.home);
    assert_eq!(yaml.idle_timeout(), Duration::from_secs(12));
}

#[test]
fn test_config_missing_file() {
    let dir = TempDir::new();
    let err = ServerConfig::load(dir.path().join("absent.txt")).unwrap_err();

    assert!(matches!(err, ConfigError::Io { .. }));
}
