//! Integration tests for tether-config

use std::io::Write;
use std::time::Duration;
use temp_env::with_vars;
use tether_config::domains::logging::{LogFormat, LogLevel};
use tether_config::*;

const ENV_VARS: [&str; 11] = [
    "TETHER_MAX_RETRIES",
    "TETHER_BACKOFF_BASE_MS",
    "TETHER_ACK_TIMEOUT_MS",
    "TETHER_REQUIRE_ACK",
    "TETHER_EVAL_TIMEOUT_MS",
    "TETHER_EXTENSION_ID",
    "TETHER_ORIGIN_PREFIX",
    "TETHER_DIALOG_POLL_INTERVAL_MS",
    "TETHER_DIALOG_MAX_WAIT_MS",
    "TETHER_LOG_LEVEL",
    "TETHER_LOG_FORMAT",
];

/// Run `f` with every Tether variable unset except `vars`
fn with_tether_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
    let mut all: Vec<(&str, Option<&str>)> = ENV_VARS.iter().map(|name| (*name, None)).collect();
    for &(name, value) in vars {
        all.retain(|(existing, _)| *existing != name);
        all.push((name, Some(value)));
    }
    with_vars(all, f);
}

#[test]
fn test_default_config_validation() {
    let config = TetherConfig::default();
    assert!(config.validate_all().is_ok());

    assert_eq!(config.messaging.max_retries, 3);
    assert_eq!(config.messaging.backoff_base, Duration::from_millis(150));
    assert_eq!(config.messaging.ack_timeout, Some(Duration::from_millis(3000)));
    assert!(!config.messaging.require_ack);
    assert_eq!(config.sandbox.eval_timeout, Duration::from_secs(5));
    assert_eq!(config.dialog.poll_interval, Duration::from_millis(200));
    assert_eq!(config.dialog.max_wait, Duration::from_secs(6));
}

#[test]
fn test_config_loader_from_env() {
    with_tether_env(
        &[
            ("TETHER_MAX_RETRIES", "5"),
            ("TETHER_BACKOFF_BASE_MS", "100"),
            ("TETHER_REQUIRE_ACK", "true"),
            ("TETHER_EVAL_TIMEOUT_MS", "2500"),
            ("TETHER_EXTENSION_ID", "abc"),
            ("TETHER_LOG_LEVEL", "debug"),
            ("TETHER_LOG_FORMAT", "json"),
        ],
        || {
            let config = ConfigLoader::new().from_env().unwrap();

            assert_eq!(config.messaging.max_retries, 5);
            assert_eq!(config.messaging.backoff_base, Duration::from_millis(100));
            assert!(config.messaging.require_ack);
            assert_eq!(config.sandbox.eval_timeout, Duration::from_millis(2500));
            assert_eq!(config.guard.resolved_origin_prefix(), "chrome-extension://abc/");
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.logging.format, LogFormat::Json);
        },
    );
}

#[test]
fn test_zero_ack_timeout_from_env_disables_timer() {
    with_tether_env(&[("TETHER_ACK_TIMEOUT_MS", "0")], || {
        let config = ConfigLoader::new().from_env().unwrap();
        assert_eq!(config.messaging.ack_timeout, None);
    });
}

#[test]
fn test_invalid_env_value() {
    with_tether_env(&[("TETHER_MAX_RETRIES", "many")], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvError(_)));
        assert!(err.to_string().contains("MAX_RETRIES"));
    });

    with_tether_env(&[("TETHER_LOG_LEVEL", "loud")], || {
        assert!(ConfigLoader::new().from_env().is_err());
    });
}

#[test]
fn test_custom_prefix() {
    with_vars([("APP_MAX_RETRIES", Some("1"))], || {
        let config = ConfigLoader::with_prefix("APP").from_env().unwrap();
        assert_eq!(config.messaging.max_retries, 1);
    });
}

#[test]
fn test_yaml_config_serialization() {
    let yaml = TetherConfig::generate_sample();
    assert!(yaml.contains("backoff_base_ms: 150"));
    assert!(yaml.contains("eval_timeout_ms: 5000"));

    let parsed: TetherConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, TetherConfig::default());
}

#[test]
fn test_comprehensive_config_file() {
    let yaml = r#"
messaging:
  max_retries: 2
  backoff_base_ms: 100
  ack_timeout_ms: null
  require_ack: true

sandbox:
  eval_timeout_ms: 1000
  loop_iteration_limit: 5000
  recursion_limit: null

guard:
  extension_id: "abcdef"
  origin_prefix: "moz-extension://abcdef/"

dialog:
  poll_interval_ms: 100
  max_wait_ms: 1000

logging:
  level: warn
  format: compact
"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_tether_env(&[], || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();

        assert_eq!(config.messaging.max_retries, 2);
        assert_eq!(config.messaging.ack_timeout, None);
        assert!(config.messaging.require_ack);
        assert_eq!(config.sandbox.loop_iteration_limit, Some(5000));
        assert_eq!(config.sandbox.recursion_limit, None);
        assert_eq!(config.guard.resolved_origin_prefix(), "moz-extension://abcdef/");
        assert_eq!(config.dialog.max_wait, Duration::from_secs(1));
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.logging.format, LogFormat::Compact);
    });
}

#[test]
fn test_env_overrides_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "messaging:\n  max_retries: 2").unwrap();

    with_tether_env(&[("TETHER_MAX_RETRIES", "7")], || {
        let config = ConfigLoader::new().load(Some(file.path())).unwrap();
        assert_eq!(config.messaging.max_retries, 7);
    });
}

#[test]
fn test_partial_file_keeps_defaults() {
    with_tether_env(&[], || {
        let config = ConfigLoader::new()
            .from_yaml("dialog:\n  max_wait_ms: 9000\n")
            .unwrap();

        assert_eq!(config.dialog.max_wait, Duration::from_secs(9));
        assert_eq!(config.dialog.poll_interval, Duration::from_millis(200));
        assert_eq!(config.messaging, MessagingConfig::default());
    });
}

#[test]
fn test_poll_interval_cannot_exceed_max_wait() {
    with_tether_env(&[], || {
        let err = ConfigLoader::new()
            .from_yaml("dialog:\n  poll_interval_ms: 500\n  max_wait_ms: 100\n")
            .unwrap_err();

        match err {
            ConfigError::DomainError { domain, message } => {
                assert_eq!(domain, "dialog");
                assert!(message.contains("poll_interval_ms"));
            }
            other => panic!("unexpected error: {}", other),
        }
    });
}

#[test]
fn test_zero_durations_rejected() {
    with_tether_env(&[], || {
        assert!(ConfigLoader::new()
            .from_yaml("messaging:\n  backoff_base_ms: 0\n")
            .is_err());
        assert!(ConfigLoader::new()
            .from_yaml("sandbox:\n  eval_timeout_ms: 0\n")
            .is_err());
    });
}

#[test]
fn test_missing_file() {
    let err = ConfigLoader::new()
        .from_file("/nonexistent/tether.yaml")
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileReadError(_)));
}

#[test]
fn test_malformed_yaml() {
    with_tether_env(&[], || {
        let err = ConfigLoader::new()
            .from_yaml("messaging: [not, a, map]")
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    });
}
