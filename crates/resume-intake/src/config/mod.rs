use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::workflows::intake::FieldMapping;

const DEFAULT_FORM_ID: &str = "1FAIpQLSe1n_fKUjx17L2rOg2WkpoeS7lZoZdaZEDTajbKFMJ2sh5cPg";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RESUME_MAX_BYTES: usize = 10 * 1024 * 1024;

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

/// Top-level configuration for the intake service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub http: HttpClientConfig,
    pub storage: StorageConfig,
    pub forms: FormsConfig,
    pub credentials: CredentialConfig,
    pub resume: ResumeConfig,
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

        let timeout_secs = parse_number("APP_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "APP_HTTP_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        let max_bytes = parse_number("RESUME_MAX_BYTES", DEFAULT_RESUME_MAX_BYTES)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            http: HttpClientConfig {
                timeout: Duration::from_secs(timeout_secs),
            },
            storage: StorageConfig::from_env()?,
            forms: FormsConfig::from_env(),
            credentials: CredentialConfig::from_env()?,
            resume: ResumeConfig { max_bytes },
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

/// Outbound request limits shared by the storage and forms clients.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
}

/// Where résumés are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Drive {
        api_base: String,
        folder_id: Option<String>,
    },
    Object {
        upload_url: String,
        public_url: String,
    },
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "drive".to_string());
        match backend.trim().to_ascii_lowercase().as_str() {
            "drive" => Ok(Self::Drive {
                api_base: env::var("DRIVE_API_BASE")
                    .unwrap_or_else(|_| "https://www.googleapis.com".to_string()),
                folder_id: non_empty_var("DRIVE_FOLDER_ID"),
            }),
            "object" => {
                let upload_url = non_empty_var("OBJECT_STORE_URL")
                    .ok_or(ConfigError::MissingVar("OBJECT_STORE_URL"))?;
                let public_url =
                    non_empty_var("OBJECT_STORE_PUBLIC_URL").unwrap_or_else(|| upload_url.clone());
                Ok(Self::Object {
                    upload_url,
                    public_url,
                })
            }
            _ => Err(ConfigError::UnknownStorageBackend(backend)),
        }
    }
}

/// Forms backend endpoint and entry mapping.
#[derive(Debug, Clone)]
pub struct FormsConfig {
    pub base_url: String,
    pub form_id: String,
    pub mapping: FieldMapping,
    pub soft_failure_marker: Option<String>,
}

impl FormsConfig {
    fn from_env() -> Self {
        let defaults = FieldMapping::v1();
        Self {
            base_url: env::var("FORM_BASE_URL")
                .unwrap_or_else(|_| "https://docs.google.com".to_string()),
            form_id: non_empty_var("FORM_ID").unwrap_or_else(|| DEFAULT_FORM_ID.to_string()),
            mapping: FieldMapping {
                name: non_empty_var("FORM_ENTRY_NAME").unwrap_or(defaults.name),
                email: non_empty_var("FORM_ENTRY_EMAIL").unwrap_or(defaults.email),
                resume_url: non_empty_var("FORM_ENTRY_RESUME").unwrap_or(defaults.resume_url),
            },
            soft_failure_marker: non_empty_var("FORM_SOFT_FAILURE_MARKER"),
        }
    }
}

/// Pre-provisioned storage credential, if any.
#[derive(Clone, Default)]
pub struct CredentialConfig {
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let expires_at = match non_empty_var("STORAGE_TOKEN_EXPIRES_AT") {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map_err(|source| ConfigError::InvalidTimestamp {
                        var: "STORAGE_TOKEN_EXPIRES_AT",
                        value: raw.clone(),
                        source,
                    })?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(Self {
            access_token: non_empty_var("STORAGE_ACCESS_TOKEN"),
            expires_at,
        })
    }
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ResumeConfig {
    pub max_bytes: usize,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(var) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        None => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidNumber {
        var: &'static str,
        value: String,
    },
    InvalidTimestamp {
        var: &'static str,
        value: String,
        source: chrono::ParseError,
    },
    MissingVar(&'static str),
    UnknownStorageBackend(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} must be a positive integer (found '{value}')")
            }
            ConfigError::InvalidTimestamp { var, value, .. } => {
                write!(f, "{var} must be an RFC 3339 timestamp (found '{value}')")
            }
            ConfigError::MissingVar(var) => write!(f, "{var} is required"),
            ConfigError::UnknownStorageBackend(value) => write!(
                f,
                "STORAGE_BACKEND must be 'drive' or 'object' (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidTimestamp { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::MissingVar(_)
            | ConfigError::UnknownStorageBackend(_) => None,
        }
    }
}
