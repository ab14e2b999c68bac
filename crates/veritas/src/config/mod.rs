use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROVIDER_ENDPOINT: &str =
    "https://qa.mie.co.za/internal/services/epcvrequest/epcvrequest.asmx";
pub const DEFAULT_PROVIDER_SOURCE: &str = "SMARTWEB";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
/// Provider callbacks carry base64 PDFs, so the limit sits well above axum's 2 MiB default.
pub const DEFAULT_CALLBACK_MAX_BYTES: usize = 64 * 1024 * 1024;

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
///
/// Loaded once at startup and handed to each component; nothing reads the
/// environment after this point.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub provider: ProviderConfig,
    pub callback: CallbackConfig,
    pub documents: DocumentStoreConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            provider: ProviderConfig::from_env()?,
            callback: CallbackConfig::from_env()?,
            documents: DocumentStoreConfig::from_env(),
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

/// A username/password pair. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret {
    pub username: String,
    pub password: String,
}

impl SharedSecret {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn from_env(user_var: &str, pass_var: &str) -> Option<Self> {
        let username = non_empty_var(user_var)?;
        let password = non_empty_var(pass_var)?;
        Some(Self { username, password })
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for the verification provider's SOAP service.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub probe_endpoint: String,
    pub source: String,
    pub timeout: Duration,
    /// `None` when `MIE_USERNAME`/`MIE_PASSWORD` are not both set.
    pub credentials: Option<SharedSecret>,
}

impl ProviderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint =
            non_empty_var("MIE_ENDPOINT").unwrap_or_else(|| DEFAULT_PROVIDER_ENDPOINT.to_string());
        let probe_endpoint =
            non_empty_var("MIE_PROBE_ENDPOINT").unwrap_or_else(|| endpoint.clone());
        let source =
            non_empty_var("MIE_SOURCE").unwrap_or_else(|| DEFAULT_PROVIDER_SOURCE.to_string());

        let timeout_secs = match non_empty_var("MIE_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout)?,
            None => DEFAULT_PROVIDER_TIMEOUT_SECS,
        };

        Ok(Self {
            endpoint,
            probe_endpoint,
            source,
            timeout: Duration::from_secs(timeout_secs),
            credentials: SharedSecret::from_env("MIE_USERNAME", "MIE_PASSWORD"),
        })
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PROVIDER_ENDPOINT.to_string(),
            probe_endpoint: DEFAULT_PROVIDER_ENDPOINT.to_string(),
            source: DEFAULT_PROVIDER_SOURCE.to_string(),
            timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            credentials: None,
        }
    }
}

/// Expected shared secret and body ceiling for inbound provider callbacks.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    /// `None` rejects every callback.
    pub credentials: Option<SharedSecret>,
    pub max_body_bytes: usize,
}

impl CallbackConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_body_bytes = match non_empty_var("MIE_CALLBACK_MAX_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|bytes| *bytes > 0)
                .ok_or(ConfigError::InvalidCallbackLimit)?,
            None => DEFAULT_CALLBACK_MAX_BYTES,
        };

        Ok(Self {
            credentials: SharedSecret::from_env("MIE_CALLBACK_USERNAME", "MIE_CALLBACK_PASSWORD"),
            max_body_bytes,
        })
    }
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            max_body_bytes: DEFAULT_CALLBACK_MAX_BYTES,
        }
    }
}

/// Location of extracted report documents and the URL prefix they are served under.
#[derive(Debug, Clone)]
pub struct DocumentStoreConfig {
    pub directory: PathBuf,
    pub public_base_url: String,
}

impl DocumentStoreConfig {
    fn from_env() -> Self {
        let directory = non_empty_var("VERITAS_DOCUMENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/verification-pdfs"));
        let public_base_url = non_empty_var("VERITAS_DOCUMENT_BASE_URL")
            .unwrap_or_else(|| "http://127.0.0.1:3000/documents".to_string());

        Self {
            directory,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidCallbackLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "MIE_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidCallbackLimit => {
                write!(f, "MIE_CALLBACK_MAX_BYTES must be a positive byte count")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidCallbackLimit => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
