use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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
    pub household: HouseholdConfig,
    pub scoring: ScoringConfig,
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

        let members = parse_household(
            &env::var("APP_HOUSEHOLD").unwrap_or_else(|_| "ben,melissa".to_string()),
        )?;

        let travel_times = env::var("APP_TRAVEL_TIMES")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let rebuild_secs = env::var("APP_QUEUE_REBUILD_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidRebuildInterval)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            household: HouseholdConfig { members },
            scoring: ScoringConfig {
                travel_times,
                queue_rebuild_interval: (rebuild_secs > 0).then(|| Duration::from_secs(rebuild_secs)),
            },
        })
    }
}

fn parse_household(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut members: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        if !members.iter().any(|existing| existing.eq_ignore_ascii_case(name)) {
            members.push(name.to_string());
        }
    }

    if members.is_empty() {
        return Err(ConfigError::EmptyHousehold);
    }
    Ok(members)
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// The fixed set of people reviewing listings together.
#[derive(Debug, Clone)]
pub struct HouseholdConfig {
    pub members: Vec<String>,
}

/// Inputs for default score computation and the periodic queue rebuild.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Precomputed travel-time table (`origin,destination,seconds,text`).
    pub travel_times: Option<PathBuf>,
    /// `None` disables the background rebuild.
    pub queue_rebuild_interval: Option<Duration>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRebuildInterval,
    EmptyHousehold,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRebuildInterval => {
                write!(f, "APP_QUEUE_REBUILD_SECS must be a whole number of seconds")
            }
            ConfigError::EmptyHousehold => {
                write!(f, "APP_HOUSEHOLD must name at least one reviewer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidRebuildInterval
            | ConfigError::EmptyHousehold => None,
        }
    }
}
