use ilmo::{AppConfig, config::Env};
use serial_test::serial;
use std::{env, panic, time::Duration};

// Every variable AppConfig::load reads. Cleared before each test so the host
// environment cannot leak in.
const ALL_VARS: [&str; 13] = [
    "APP_ENV",
    "ROOT_URL",
    "GRAPHQL_URL",
    "JWT_SECRET",
    "BIND_ADDR",
    "PROJECT_NAME",
    "ORGANIZATION_NAME",
    "PRIVACY_URL",
    "T_AND_C_URL",
    "SENTRY_DSN",
    "ENABLE_REGISTRATION",
    "VIEWER_FETCH_TIMEOUT_MS",
    "CURRENT_USER_POLL_SECS",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with exactly `vars` set and restores the environment afterward.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    // Save current environment variables
    let originals: Vec<(String, Option<String>)> = ALL_VARS
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    unsafe {
        for var in ALL_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    // Restore original environment variables
    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    // Re-panic if the test failed
    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    // GRAPHQL_URL and JWT_SECRET are missing
    let result = run_with_env(
        &[("APP_ENV", "production"), ("ROOT_URL", "https://ilmo.example")],
        || panic::catch_unwind(AppConfig::load),
    );

    assert!(
        result.is_err(),
        "Production config loading should panic on missing secrets"
    );
}

#[test]
#[serial]
fn test_app_config_requires_root_url() {
    let result = run_with_env(&[("APP_ENV", "local")], || {
        panic::catch_unwind(AppConfig::load)
    });

    assert!(result.is_err(), "ROOT_URL is required in every environment");
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(
        &[("APP_ENV", "local"), ("ROOT_URL", "http://localhost:5678")],
        AppConfig::load,
    );

    assert_eq!(config.env, Env::Local);
    // No endpoint means the demo data service
    assert_eq!(config.graphql_url, None);
    // Check local JWT secret fallback
    assert_eq!(config.jwt_secret, "super-secure-test-secret-value-local");
    assert_eq!(config.bind_addr, "0.0.0.0:5678");
    assert_eq!(config.project_name, "Ilmo");
    assert_eq!(config.org_name, "Prodeko");
    assert!(!config.enable_registration);
    assert_eq!(config.viewer_timeout, Duration::from_millis(3000));
    assert_eq!(config.current_user_poll, Duration::from_secs(15));
    assert!(!config.cookie_secure());
    assert!(!config.telemetry_enabled());
}

#[test]
#[serial]
fn test_app_config_production_full() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("ROOT_URL", "https://ilmo.example"),
            ("GRAPHQL_URL", "https://ilmo.example/graphql"),
            ("JWT_SECRET", "prod-secret"),
            ("ENABLE_REGISTRATION", "true"),
            ("SENTRY_DSN", "https://key@sentry.example/1"),
            ("PRIVACY_URL", "https://ilmo.example/privacy"),
            ("VIEWER_FETCH_TIMEOUT_MS", "250"),
            ("CURRENT_USER_POLL_SECS", "2"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(
        config.graphql_url.as_deref(),
        Some("https://ilmo.example/graphql")
    );
    assert_eq!(config.jwt_secret, "prod-secret");
    assert!(config.enable_registration);
    assert!(config.cookie_secure());
    assert!(config.telemetry_enabled());
    assert_eq!(
        config.privacy_url.as_deref(),
        Some("https://ilmo.example/privacy")
    );
    assert_eq!(config.viewer_timeout, Duration::from_millis(250));
    assert_eq!(config.current_user_poll, Duration::from_secs(2));
}

#[test]
#[serial]
fn test_app_config_ignores_blank_and_malformed_values() {
    let config = run_with_env(
        &[
            ("ROOT_URL", "http://localhost:5678"),
            ("PRIVACY_URL", "   "),
            ("ENABLE_REGISTRATION", "maybe"),
            ("VIEWER_FETCH_TIMEOUT_MS", "soon"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.privacy_url, None);
    assert!(!config.enable_registration);
    assert_eq!(config.viewer_timeout, Duration::from_millis(3000));
}
