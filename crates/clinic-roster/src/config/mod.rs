use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::Weekday;

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
    pub roster: RosterConfig,
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

        let roster = RosterConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            roster,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Roster policy knobs and scheduling constants.
///
/// Thresholds and platform identifiers are configuration rather than code;
/// the defaults mirror the community's production setup.
#[derive(Debug, Clone)]
pub struct RosterConfig {
    /// External platform rank code members are parked on while on leave.
    pub on_leave_rank_code: u64,
    /// Days a member must wait after a leave ends before starting another.
    pub leave_cooldown_days: i64,
    /// Minimum length of a self-requested leave.
    pub min_leave_days: i64,
    /// Seconds between leave-expiry poll ticks.
    pub leave_poll_interval_secs: u64,
    /// Day of week the evaluation cycle fires.
    pub cycle_weekday: Weekday,
    /// UTC hour the evaluation cycle fires.
    pub cycle_hour: u32,
    /// Upper bound on outbound platform calls, in seconds.
    pub outbound_timeout_secs: u64,
}

impl RosterConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let on_leave_rank_code = parse_env_u64("ROSTER_LEAVE_RANK_CODE", 79_840_093)?;
        let leave_cooldown_days = parse_env_u64("ROSTER_LEAVE_COOLDOWN_DAYS", 14)? as i64;
        let min_leave_days = parse_env_u64("ROSTER_MIN_LEAVE_DAYS", 7)? as i64;
        let leave_poll_interval_secs = parse_env_u64("ROSTER_LEAVE_POLL_SECS", 60)?;
        let cycle_hour = parse_env_u64("ROSTER_CYCLE_HOUR", 16)? as u32;
        let outbound_timeout_secs = parse_env_u64("ROSTER_OUTBOUND_TIMEOUT_SECS", 10)?;

        if cycle_hour > 23 {
            return Err(ConfigError::InvalidCycleHour);
        }

        Ok(Self {
            on_leave_rank_code,
            leave_cooldown_days,
            min_leave_days,
            leave_poll_interval_secs,
            cycle_weekday: Weekday::Fri,
            cycle_hour,
            outbound_timeout_secs,
        })
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            on_leave_rank_code: 79_840_093,
            leave_cooldown_days: 14,
            min_leave_days: 7,
            leave_poll_interval_secs: 60,
            cycle_weekday: Weekday::Fri,
            cycle_hour: 16,
            outbound_timeout_secs: 10,
        }
    }
}

fn parse_env_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: String },
    InvalidCycleHour,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::InvalidCycleHour => {
                write!(f, "ROSTER_CYCLE_HOUR must be within 0..=23")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("ROSTER_LEAVE_RANK_CODE");
        env::remove_var("ROSTER_LEAVE_COOLDOWN_DAYS");
        env::remove_var("ROSTER_MIN_LEAVE_DAYS");
        env::remove_var("ROSTER_LEAVE_POLL_SECS");
        env::remove_var("ROSTER_CYCLE_HOUR");
        env::remove_var("ROSTER_OUTBOUND_TIMEOUT_SECS");
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
        assert_eq!(config.roster.leave_cooldown_days, 14);
        assert_eq!(config.roster.cycle_weekday, Weekday::Fri);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        env::remove_var("APP_HOST");
    }

    #[test]
    fn rejects_out_of_range_cycle_hour() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ROSTER_CYCLE_HOUR", "24");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidCycleHour)
        ));
        env::remove_var("ROSTER_CYCLE_HOUR");
    }
}
