use std::{env, time::Duration};

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared read-only with every request through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and the demo data service.
    pub env: Env,
    // Public base URL of the site. Also decides whether cookies are marked `Secure`.
    pub root_url: String,
    // GraphQL endpoint of the data service. `None` only in local mode (demo service).
    pub graphql_url: Option<String>,
    // Shared secret used to validate session tokens issued by the data service.
    pub jwt_secret: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    pub project_name: String,
    pub org_name: String,
    pub privacy_url: Option<String>,
    pub t_and_c_url: Option<String>,
    // Error reporting endpoint. Only its presence is checked.
    pub sentry_dsn: Option<String>,
    // Feature flag: self-service account registration.
    pub enable_registration: bool,
    // Deadline for the per-request viewer fetch before the page renders as pending.
    pub viewer_timeout: Duration,
    // Interval at which the current-user subscription re-checks the viewer.
    pub current_user_poll: Duration,
}

/// Env
///
/// Defines the runtime context. `Local` allows running without a data service.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

impl Default for AppConfig {
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            root_url: "http://localhost:5678".to_string(),
            graphql_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: "127.0.0.1:5678".to_string(),
            project_name: "Ilmo".to_string(),
            org_name: "Prodeko".to_string(),
            privacy_url: None,
            t_and_c_url: None,
            sentry_dsn: None,
            enable_registration: true,
            viewer_timeout: Duration::from_millis(3000),
            current_user_poll: Duration::from_secs(15),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and fails fast.
    ///
    /// # Panics
    /// Panics if `ROOT_URL` is missing, or if `GRAPHQL_URL` / `JWT_SECRET` are missing
    /// in production.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let root_url = env::var("ROOT_URL").expect("FATAL: ROOT_URL is a required envvar");

        let (graphql_url, jwt_secret) = match env {
            Env::Production => (
                Some(env::var("GRAPHQL_URL").expect("FATAL: GRAPHQL_URL required in prod")),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                optional("GRAPHQL_URL"),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let defaults = Self::default();

        Self {
            env,
            root_url,
            graphql_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5678".to_string()),
            project_name: env::var("PROJECT_NAME").unwrap_or(defaults.project_name),
            org_name: env::var("ORGANIZATION_NAME").unwrap_or(defaults.org_name),
            privacy_url: optional("PRIVACY_URL"),
            t_and_c_url: optional("T_AND_C_URL"),
            sentry_dsn: optional("SENTRY_DSN"),
            enable_registration: env_bool("ENABLE_REGISTRATION").unwrap_or(false),
            viewer_timeout: env_u64("VIEWER_FETCH_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.viewer_timeout),
            current_user_poll: env_u64("CURRENT_USER_POLL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.current_user_poll),
        }
    }

    /// Cookies are only marked `Secure` when the site is served over https.
    pub fn cookie_secure(&self) -> bool {
        self.root_url.starts_with("https://")
    }

    /// Whether failures should be flagged for the error reporting pipeline.
    pub fn telemetry_enabled(&self) -> bool {
        self.sentry_dsn.is_some()
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}
