use std::{env, fmt};

use super::database_url;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name used for logging labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

const DEFAULT_BROADCAST_BUFFER: usize = 256;

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    /// Capacity of each realtime channel's broadcast buffer.
    pub broadcast_buffer: usize,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let database_url = database_url();
        let broadcast_buffer = match env::var("BROADCAST_BUFFER") {
            Ok(raw) => {
                let value: usize = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidBroadcastBuffer(raw.clone()))?;
                if value == 0 {
                    return Err(ConfigError::InvalidBroadcastBuffer(raw));
                }
                value
            }
            Err(_) => DEFAULT_BROADCAST_BUFFER,
        };

        Ok(Self {
            environment,
            database_url,
            broadcast_buffer,
        })
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    InvalidBroadcastBuffer(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::InvalidBroadcastBuffer(value) => {
                write!(f, "BROADCAST_BUFFER must be a positive integer (got {value})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static ENV_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    #[test]
    fn loads_defaults_in_development() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        env::remove_var("APP_ENV");
        env::remove_var("DATABASE_URL");
        env::remove_var("BROADCAST_BUFFER");

        let config = AppConfig::from_env().expect("config should load with defaults");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.database_url, crate::DEFAULT_DATABASE_URL);
        assert_eq!(config.broadcast_buffer, DEFAULT_BROADCAST_BUFFER);
    }

    #[test]
    fn rejects_invalid_environment() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        env::set_var("APP_ENV", "invalid");

        let err = AppConfig::from_env().expect_err("invalid env should error");
        assert!(matches!(err, ConfigError::InvalidEnvironment(value) if value == "invalid"));

        env::remove_var("APP_ENV");
    }

    #[test]
    fn rejects_zero_broadcast_buffer() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        env::remove_var("APP_ENV");
        env::set_var("BROADCAST_BUFFER", "0");

        let err = AppConfig::from_env().expect_err("zero buffer should error");
        assert!(matches!(err, ConfigError::InvalidBroadcastBuffer(_)));

        env::remove_var("BROADCAST_BUFFER");
    }
}
