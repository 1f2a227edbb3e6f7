//! Tests for configuration file loading.

use super::*;
use serial_test::serial;
use std::env;
use std::fs;

/// Removes an environment variable on creation and again on drop.
struct EnvGuard(&'static str);

impl EnvGuard {
    fn new(name: &'static str) -> Self {
        env::remove_var(name);
        Self(name)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        env::remove_var(self.0);
    }
}

#[test]
fn default_config_path_contains_nestcanvas_config_toml() {
    if let Some(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(
            path_str.contains("nestcanvas") && path_str.ends_with("config.toml"),
            "Path should contain 'nestcanvas' and end with 'config.toml', got: {}",
            path_str
        );
    }
}

#[test]
fn default_log_path_ends_with_nestcanvas_log() {
    let path = default_log_path();
    assert!(
        path.to_string_lossy().ends_with("nestcanvas.log"),
        "Default log path should end with 'nestcanvas.log', got: {:?}",
        path
    );
}

#[test]
fn load_config_file_returns_ok_none_for_missing_file() {
    let result = load_config_file("/nonexistent/path/to/config.toml");
    assert_eq!(
        result,
        Ok(None),
        "Missing config file should return Ok(None), not an error"
    );
}

#[test]
fn load_config_file_parses_valid_toml() {
    let config_path = env::temp_dir().join("nestcanvas_test_config.toml");

    let toml_content = r#"
debounce_ms = 250
undo_capacity = 20
retry_attempts = 5
fit_padding = 40.5
log_file_path = "/tmp/nc.log"
"#;
    fs::write(&config_path, toml_content).expect("Failed to write test config");

    let config = load_config_file(&config_path)
        .expect("Should successfully parse valid TOML")
        .expect("Should return Some(ConfigFile) for existing file");

    assert_eq!(config.debounce_ms, Some(250));
    assert_eq!(config.undo_capacity, Some(20));
    assert_eq!(config.retry_attempts, Some(5));
    assert_eq!(config.fit_padding, Some(40.5));
    assert_eq!(config.log_file_path, Some(PathBuf::from("/tmp/nc.log")));
    assert_eq!(config.nav_timeout_ms, None);

    fs::remove_file(config_path).ok();
}

#[test]
fn load_config_file_returns_error_for_invalid_toml() {
    let config_path = env::temp_dir().join("nestcanvas_test_invalid.toml");
    fs::write(&config_path, "this is not valid TOML ][}{").expect("Failed to write invalid test config");

    match load_config_file(&config_path) {
        Err(ConfigError::ParseError { path, reason: _ }) => assert_eq!(path, config_path),
        other => panic!("Expected ParseError, got {:?}", other),
    }

    fs::remove_file(config_path).ok();
}

#[test]
fn config_file_rejects_unknown_fields() {
    let result: Result<ConfigFile, _> = toml::from_str("debounce_ms = 100\ntheme = \"dark\"\n");
    assert!(result.is_err(), "Unknown fields should be rejected");
}

#[test]
fn merge_config_uses_defaults_when_none() {
    assert_eq!(merge_config(None), ResolvedConfig::default());
}

#[test]
fn merge_config_takes_file_values_and_defaults_the_rest() {
    let resolved = merge_config(Some(ConfigFile {
        debounce_ms: Some(900),
        nav_timeout_ms: Some(2_000),
        ..ConfigFile::default()
    }));

    assert_eq!(resolved.debounce_ms, 900);
    assert_eq!(resolved.nav_timeout_ms, 2_000);
    assert_eq!(resolved.undo_capacity, 50);
    assert_eq!(resolved.fit_duration_ms, 450);
}

#[test]
fn resolved_config_default_has_expected_values() {
    let config = ResolvedConfig::default();
    assert_eq!(config.debounce_ms, 500);
    assert_eq!(config.undo_capacity, 50);
    assert_eq!(config.retry_attempts, 3);
    assert_eq!(config.retry_base_ms, 250);
    assert_eq!(config.fit_padding, 80.0);
    assert_eq!(config.nav_timeout_ms, 1_200);
    assert!(config.validate().is_ok());
}

#[test]
fn validate_rejects_zero_undo_capacity() {
    let config = ResolvedConfig {
        undo_capacity: 0,
        ..ResolvedConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue {
            field: "undo_capacity",
            ..
        })
    ));
}

#[test]
fn validate_rejects_negative_padding() {
    let config = ResolvedConfig {
        fit_padding: -1.0,
        ..ResolvedConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { field: "fit_padding", .. })
    ));
}

#[test]
fn apply_cli_overrides_replaces_only_given_values() {
    let config = apply_cli_overrides(ResolvedConfig::default(), Some(10), None);
    assert_eq!(config.debounce_ms, 10);
    assert_eq!(config.log_file_path, default_log_path());

    let config = apply_cli_overrides(config, None, Some(PathBuf::from("/x.log")));
    assert_eq!(config.debounce_ms, 10);
    assert_eq!(config.log_file_path, PathBuf::from("/x.log"));
}

#[test]
#[serial(nestcanvas_env)]
fn apply_env_overrides_respects_debounce_and_log() {
    let _debounce = EnvGuard::new(DEBOUNCE_ENV);
    let _log = EnvGuard::new(LOG_ENV);
    env::set_var(DEBOUNCE_ENV, "125");
    env::set_var(LOG_ENV, "/var/tmp/nc.log");

    let config = apply_env_overrides(ResolvedConfig::default()).unwrap();
    assert_eq!(config.debounce_ms, 125);
    assert_eq!(config.log_file_path, PathBuf::from("/var/tmp/nc.log"));
    assert_eq!(config.undo_capacity, 50, "other fields untouched");
}

#[test]
#[serial(nestcanvas_env)]
fn apply_env_overrides_rejects_non_numeric_debounce() {
    let _debounce = EnvGuard::new(DEBOUNCE_ENV);
    env::set_var(DEBOUNCE_ENV, "soon");

    assert!(matches!(
        apply_env_overrides(ResolvedConfig::default()),
        Err(ConfigError::InvalidValue { field: "debounce_ms", .. })
    ));
}

#[test]
#[serial(nestcanvas_env)]
fn apply_env_overrides_no_change_when_env_var_not_set() {
    let _debounce = EnvGuard::new(DEBOUNCE_ENV);
    let _log = EnvGuard::new(LOG_ENV);
    assert_eq!(
        apply_env_overrides(ResolvedConfig::default()).unwrap(),
        ResolvedConfig::default()
    );
}

#[test]
#[serial(nestcanvas_config)]
fn load_config_with_precedence_prefers_explicit_path() {
    let _guard = EnvGuard::new(CONFIG_ENV);
    let dir = env::temp_dir();
    let explicit = dir.join("nestcanvas_explicit.toml");
    let from_env = dir.join("nestcanvas_env.toml");
    fs::write(&explicit, "debounce_ms = 1").unwrap();
    fs::write(&from_env, "debounce_ms = 2").unwrap();
    env::set_var(CONFIG_ENV, from_env.to_str().unwrap());

    let config = load_config_with_precedence(Some(explicit.clone())).unwrap().unwrap();
    assert_eq!(config.debounce_ms, Some(1));

    fs::remove_file(explicit).ok();
    fs::remove_file(from_env).ok();
}

#[test]
#[serial(nestcanvas_config)]
fn load_config_with_precedence_uses_env_var_when_no_explicit_path() {
    let _guard = EnvGuard::new(CONFIG_ENV);
    let from_env = env::temp_dir().join("nestcanvas_env_only.toml");
    fs::write(&from_env, "undo_capacity = 7").unwrap();
    env::set_var(CONFIG_ENV, from_env.to_str().unwrap());

    let config = load_config_with_precedence(None).unwrap().unwrap();
    assert_eq!(config.undo_capacity, Some(7));

    fs::remove_file(from_env).ok();
}

#[test]
#[serial(nestcanvas_config)]
fn empty_config_env_var_is_an_invalid_path() {
    let _guard = EnvGuard::new(CONFIG_ENV);
    env::set_var(CONFIG_ENV, "  ");
    assert!(matches!(
        load_config_with_precedence(None),
        Err(ConfigError::InvalidPath(_))
    ));
}

#[test]
#[serial(nestcanvas_env)]
fn precedence_chain_file_then_env_then_cli() {
    let _debounce = EnvGuard::new(DEBOUNCE_ENV);
    let _log = EnvGuard::new(LOG_ENV);
    let path = env::temp_dir().join("nestcanvas_chain.toml");
    fs::write(&path, "debounce_ms = 700\nundo_capacity = 9\n").unwrap();

    env::set_var(DEBOUNCE_ENV, "600");
    let config = resolve(Some(path.clone()), None, None).unwrap();
    assert_eq!(config.debounce_ms, 600, "env beats file");
    assert_eq!(config.undo_capacity, 9);

    let config = resolve(Some(path.clone()), Some(50), None).unwrap();
    assert_eq!(config.debounce_ms, 50, "CLI beats env");

    fs::remove_file(path).ok();
}

#[test]
#[serial(nestcanvas_env)]
fn resolve_validates_the_result() {
    let _debounce = EnvGuard::new(DEBOUNCE_ENV);
    let _log = EnvGuard::new(LOG_ENV);
    let path = env::temp_dir().join("nestcanvas_invalid_values.toml");
    fs::write(&path, "retry_attempts = 0\n").unwrap();

    assert!(matches!(
        resolve(Some(path.clone()), None, None),
        Err(ConfigError::InvalidValue {
            field: "retry_attempts",
            ..
        })
    ));

    fs::remove_file(path).ok();
}
