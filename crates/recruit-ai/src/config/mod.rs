use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_EVALUATOR_URL: &str = "http://localhost:3000";
const DEFAULT_EVALUATOR_TIMEOUT_SECS: u64 = 60;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub evaluator: EvaluatorConfig,
    pub quizzes: QuizPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let timeout_secs = match env::var("EVALUATOR_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout)?,
            Err(_) => DEFAULT_EVALUATOR_TIMEOUT_SECS,
        };

        let enforce_point_totals = match env::var("QUIZ_ENFORCE_POINT_TOTALS") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "QUIZ_ENFORCE_POINT_TOTALS",
            })?,
            Err(_) => false,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            evaluator: EvaluatorConfig {
                base_url: resolve_base_url(|key| env::var(key).ok()),
                timeout: Duration::from_secs(timeout_secs),
            },
            quizzes: QuizPolicy {
                enforce_point_totals,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the interview evaluation service, resolved once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl EvaluatorConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_EVALUATOR_TIMEOUT_SECS),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/gemini", self.base_url.trim_end_matches('/'))
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_EVALUATOR_URL)
    }
}

/// Rules applied when quizzes are authored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizPolicy {
    /// Reject quizzes whose question points do not add up to `total_points`
    /// instead of only warning about them.
    pub enforce_point_totals: bool,
}

/// Walks the deployment fallback chain for the application base URL.
pub fn resolve_base_url<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = present("NEXT_PUBLIC_APP_URL") {
        return url;
    }
    if let Some(url) = present("NEXTAUTH_URL") {
        return url;
    }
    if let Some(host) = present("VERCEL_URL") {
        return format!("https://{host}");
    }
    DEFAULT_EVALUATOR_URL.to_string()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidFlag { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "EVALUATOR_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidFlag { name } => write!(f, "{name} must be true or false"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "NEXT_PUBLIC_APP_URL",
            "NEXTAUTH_URL",
            "VERCEL_URL",
            "EVALUATOR_TIMEOUT_SECS",
            "QUIZ_ENFORCE_POINT_TOTALS",
        ] {
            env::remove_var(key);
        }
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.evaluator.timeout, Duration::from_secs(60));
        assert!(!config.quizzes.enforce_point_totals);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8080));
        reset_env();
    }

    #[test]
    fn rejects_unparseable_point_total_flag() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("QUIZ_ENFORCE_POINT_TOTALS", "sometimes");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag { .. })
        ));
        reset_env();
    }

    #[test]
    fn base_url_prefers_public_app_url() {
        let lookup = lookup_from(&[
            ("NEXT_PUBLIC_APP_URL", "https://app.example.com"),
            ("NEXTAUTH_URL", "https://auth.example.com"),
            ("VERCEL_URL", "preview.vercel.app"),
        ]);
        assert_eq!(resolve_base_url(lookup), "https://app.example.com");
    }

    #[test]
    fn base_url_falls_through_chain() {
        let auth = lookup_from(&[("NEXTAUTH_URL", "https://auth.example.com")]);
        assert_eq!(resolve_base_url(auth), "https://auth.example.com");

        let vercel = lookup_from(&[("NEXTAUTH_URL", " "), ("VERCEL_URL", "preview.vercel.app")]);
        assert_eq!(resolve_base_url(vercel), "https://preview.vercel.app");

        let empty = lookup_from(&[]);
        assert_eq!(resolve_base_url(empty), "http://localhost:3000");
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = EvaluatorConfig::new("https://app.example.com/");
        assert_eq!(config.endpoint(), "https://app.example.com/api/gemini");
    }
}
