pub mod config;

use std::env;

pub use config::{AppConfig, ConfigError, Environment};

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:?cache=shared";

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Returns the database connection string the application should use.
///
/// The value is resolved from the `DATABASE_URL` environment variable and
/// falls back to [`DEFAULT_DATABASE_URL`] when the variable is not set.
pub fn database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        env,
        sync::{LazyLock, Mutex},
    };

    static ENV_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    #[test]
    fn returns_default_url_when_env_missing() {
        let _lock = ENV_GUARD.lock().expect("env guard poisoned");
        env::remove_var("DATABASE_URL");
        assert_eq!(database_url(), DEFAULT_DATABASE_URL);
    }

    #[test]
    fn reads_custom_url_from_env() {
        let _lock = ENV_GUARD.lock().expect("env guard poisoned");
        env::set_var("DATABASE_URL", "sqlite:crewdeck.db");
        assert_eq!(database_url(), "sqlite:crewdeck.db");
        env::remove_var("DATABASE_URL");
    }
}
