//! Client configuration loaded from environment variables.
//!
//! All settings come from `EVENTHUB_*` environment variables (or a `.env`
//! file via `dotenvy`). Unset or unparsable numeric values fall back to
//! defaults; only the API URL is validated strictly.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::ClientError;

/// Default backend address.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Top-level client configuration.
///
/// Loaded once via [`ClientConfig::from_env`], or built in code with
/// [`ClientConfig::new`] and the `with_*` setters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend (e.g. `http://10.0.2.2:3000`).
    pub api_url: Url,

    /// Deadline applied to every request.
    pub request_timeout: Duration,

    /// File holding the persisted session.
    pub session_path: PathBuf,

    /// Lifetime of a new or refreshed session.
    pub session_ttl: Duration,

    /// Capacity of the invalidation broadcast channel.
    pub invalidation_capacity: usize,

    /// Whether the binary should emit JSON logs.
    pub log_json: bool,
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the URL.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            request_timeout: Duration::from_secs(30),
            session_path: PathBuf::from(".eventhub/session.json"),
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            invalidation_capacity: 1024,
            log_json: false,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `EVENTHUB_API_URL` is set but is
    /// not an absolute `http(s)` URL.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();

        let raw_url =
            std::env::var("EVENTHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_url = parse_api_url(&raw_url)?;

        let defaults = Self::new(api_url);

        Ok(Self {
            request_timeout: Duration::from_secs(parse_env(
                "EVENTHUB_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            session_path: std::env::var("EVENTHUB_SESSION_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| defaults.session_path.clone()),
            session_ttl: Duration::from_secs(parse_env(
                "EVENTHUB_SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )),
            invalidation_capacity: parse_env(
                "EVENTHUB_INVALIDATION_CAPACITY",
                defaults.invalidation_capacity,
            ),
            log_json: parse_env_bool("EVENTHUB_LOG_JSON", defaults.log_json),
            ..defaults
        })
    }

    /// Overrides the request deadline.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the session file location.
    #[must_use]
    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = path.into();
        self
    }

    /// Overrides the session lifetime.
    #[must_use]
    pub const fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }
}

/// Parses and checks the backend base URL.
///
/// # Errors
///
/// Returns [`ClientError::Config`] for unparsable or non-HTTP URLs.
pub fn parse_api_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ClientError::Config(format!("invalid api url {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Config(format!(
            "api url must be http or https, got {}",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() {
        return Err(ClientError::Config(format!("api url {raw:?} cannot be a base")));
    }
    Ok(url)
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
