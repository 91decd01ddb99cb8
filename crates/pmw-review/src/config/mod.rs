use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::review::PortalRole;

/// Deployment stage the portal runs in (`APP_ENV`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub portal: PortalConfig,
}

impl AppConfig {
    /// Reads the process environment, after merging a `.env` file when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port_raw = var_or("APP_PORT", "3000");
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort { value: port_raw })?;

        let server = ServerConfig {
            host: var_or("APP_HOST", "127.0.0.1"),
            port,
        };
        let telemetry = TelemetryConfig {
            log_level: var_or("APP_LOG_LEVEL", "info"),
        };

        let role = match env::var("PORTAL_ROLE") {
            Ok(raw) => raw
                .parse::<PortalRole>()
                .map_err(|_| ConfigError::InvalidRole { value: raw })?,
            Err(_) => PortalRole::Reviewer,
        };
        let portal = PortalConfig {
            api_base: normalize_api_base(&var_or("PORTAL_API_BASE", "/api"))?,
            role,
            distribution_csv: env::var("PORTAL_DISTRIBUTION_CSV")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
        };

        Ok(Self {
            environment: AppEnvironment::parse(&var_or("APP_ENV", "development")),
            server,
            telemetry,
            portal,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn normalize_api_base(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err(ConfigError::InvalidApiBase {
            value: raw.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Bind address of the portal API.
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

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the portal API lives and which role the client acts as.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub api_base: String,
    pub role: PortalRole,
    pub distribution_csv: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort { value: String },
    InvalidHost { source: std::net::AddrParseError },
    InvalidApiBase { value: String },
    InvalidRole { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort { value } => {
                write!(f, "APP_PORT must be a port number, got '{}'", value)
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidApiBase { value } => {
                write!(f, "PORTAL_API_BASE must be an absolute path, got '{}'", value)
            }
            ConfigError::InvalidRole { value } => {
                write!(f, "PORTAL_ROLE must be 'reviewer' or 'juri', got '{}'", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort { .. }
            | ConfigError::InvalidApiBase { .. }
            | ConfigError::InvalidRole { .. } => None,
        }
    }
}
