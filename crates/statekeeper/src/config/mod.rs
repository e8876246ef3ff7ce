use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

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
    pub storage: StorageConfig,
    pub engine: EngineConfig,
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

        let data_dir = env::var("APP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let user_id = env::var("APP_USER")
            .ok()
            .map(|user| user.trim().to_string())
            .filter(|user| !user.is_empty())
            .unwrap_or_else(|| "local-user".to_string());

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            renewal_window_days: number_var(
                "COMPLIANCE_RENEWAL_WINDOW_DAYS",
                defaults.renewal_window_days,
            )?,
            renewal_lead_days: number_var(
                "COMPLIANCE_RENEWAL_LEAD_DAYS",
                defaults.renewal_lead_days,
            )?,
            gamification: GamificationConfig {
                points_per_item: number_var(
                    "GAMIFICATION_POINTS_PER_ITEM",
                    defaults.gamification.points_per_item,
                )?,
                high_priority_bonus: number_var(
                    "GAMIFICATION_PRIORITY_BONUS",
                    defaults.gamification.high_priority_bonus,
                )?,
                on_time_bonus: number_var(
                    "GAMIFICATION_ON_TIME_BONUS",
                    defaults.gamification.on_time_bonus,
                )?,
            },
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig { data_dir, user_id },
            engine,
        })
    }
}

fn number_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        _ => Ok(default),
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

/// Where snapshots are persisted and whose gamification data to load.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub user_id: String,
}

/// Renewal window and reward tuning for the lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// A license is "expiring soon" within this many days.
    pub renewal_window_days: i64,
    /// Renewal tasks fall due this many days ahead of expiration.
    pub renewal_lead_days: i64,
    pub gamification: GamificationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            renewal_window_days: 30,
            renewal_lead_days: 15,
            gamification: GamificationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamificationConfig {
    pub points_per_item: u64,
    pub high_priority_bonus: u64,
    pub on_time_bonus: u64,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            points_per_item: 10,
            high_priority_bonus: 5,
            on_time_bonus: 5,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidNumber { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DATA_DIR",
            "APP_USER",
            "COMPLIANCE_RENEWAL_WINDOW_DAYS",
            "COMPLIANCE_RENEWAL_LEAD_DAYS",
            "GAMIFICATION_POINTS_PER_ITEM",
            "GAMIFICATION_PRIORITY_BONUS",
            "GAMIFICATION_ON_TIME_BONUS",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.storage.user_id, "local-user");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn reads_engine_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("COMPLIANCE_RENEWAL_WINDOW_DAYS", "45");
        env::set_var("GAMIFICATION_POINTS_PER_ITEM", "20");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engine.renewal_window_days, 45);
        assert_eq!(config.engine.renewal_lead_days, 15);
        assert_eq!(config.engine.gamification.points_per_item, 20);
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("COMPLIANCE_RENEWAL_WINDOW_DAYS", "a month");
        let err = AppConfig::load().expect_err("invalid number rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                var: "COMPLIANCE_RENEWAL_WINDOW_DAYS"
            }
        ));
        reset_env();
    }
}
