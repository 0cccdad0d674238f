use crate::browser::PathMode;
use crate::config::{self, AppConfig};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let cfg = AppConfig::default();

    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 5000);
    assert!(cfg.server.cors);
    assert!(cfg.server.static_dir.is_none());
    assert_eq!(cfg.sandbox.root, ".");
    assert_eq!(cfg.sandbox.mode, PathMode::Relative);
    assert!(cfg.media.image_extensions.iter().any(|e| e == "jpg"));
    assert!(cfg.media.video_extensions.iter().any(|e| e == "mp4"));
    assert_eq!(cfg.limits.max_text_bytes, 1024 * 1024);
    assert_eq!(cfg.limits.max_body_bytes, 10 * 1024 * 1024);
    assert!(cfg.limits.slow_request_secs < cfg.limits.long_request_secs);
    assert_eq!(cfg.logging.level, "info");
    assert!(cfg.security.is_none());
}

#[test]
fn test_defaults_validate() {
    assert!(config::validate(&AppConfig::default()).is_ok());
}

#[test]
fn test_invalid_server_port() {
    let mut cfg = AppConfig::default();
    cfg.server.port = 0;
    let err = config::validate(&cfg).unwrap_err();
    assert!(err.to_string().contains("invalid server.port"));
}

#[test]
fn test_root_must_be_existing_directory() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("plain.txt");
    std::fs::write(&file, "x").unwrap();

    let mut cfg = AppConfig::default();
    cfg.sandbox.root = file.to_string_lossy().into_owned();
    assert!(config::validate(&cfg).unwrap_err().to_string().contains("sandbox.root"));

    cfg.sandbox.root = tmp.path().join("missing").to_string_lossy().into_owned();
    assert!(config::validate(&cfg).is_err());

    cfg.sandbox.root = "  ".to_string();
    assert!(config::validate(&cfg).unwrap_err().to_string().contains("must not be empty"));

    cfg.sandbox.root = tmp.path().to_string_lossy().into_owned();
    assert!(config::validate(&cfg).is_ok());
}

#[test]
fn test_empty_allow_lists_rejected() {
    let mut cfg = AppConfig::default();
    cfg.media.image_extensions.clear();
    assert!(config::validate(&cfg).unwrap_err().to_string().contains("image_extensions"));

    let mut cfg = AppConfig::default();
    cfg.media.video_extensions.clear();
    assert!(config::validate(&cfg).unwrap_err().to_string().contains("video_extensions"));
}

#[test]
fn test_zero_limits_rejected() {
    let mut cfg = AppConfig::default();
    cfg.limits.max_text_bytes = 0;
    assert!(config::validate(&cfg).is_err());

    let mut cfg = AppConfig::default();
    cfg.limits.max_body_bytes = 0;
    assert!(config::validate(&cfg).is_err());

    let mut cfg = AppConfig::default();
    cfg.limits.long_request_secs = 0;
    assert!(config::validate(&cfg).is_err());
}

#[test]
fn test_log_filter() {
    let mut cfg = AppConfig::default();
    assert_eq!(cfg.log_filter(), "info,tower_http=info");
    cfg.logging.debug = true;
    assert_eq!(cfg.log_filter(), "debug,tower_http=debug");
}

#[test]
fn test_privileged_port_warning() {
    let mut cfg = AppConfig::default();
    assert!(cfg.warnings().is_empty());

    cfg.server.port = 80;
    let warnings = cfg.warnings();
    if cfg!(unix) {
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("privileged port 80"));
    }
    assert!(config::validate(&cfg).is_ok());
}
