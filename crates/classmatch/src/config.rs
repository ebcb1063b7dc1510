/// Runtime configuration read from the environment
use anyhow::{Context, Result};
use std::{env, fmt::Display, str::FromStr};
use tracing::info;

use crate::rate_limit::RateLimitPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub upload_limit: i64,
    pub upload_window_secs: i64,
}

impl Config {
    /// Loads the configuration, falling back to a default for every unset variable
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("CLASSMATCH_PORT", "8080")?,
            db_path: try_load("CLASSMATCH_DB_PATH", "classmatch.db")?,
            upload_limit: try_load("CLASSMATCH_UPLOAD_LIMIT", "5")?,
            upload_window_secs: try_load("CLASSMATCH_UPLOAD_WINDOW_SECS", "60")?,
        })
    }

    pub fn upload_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            window: chrono::Duration::seconds(self.upload_window_secs),
            limit: self.upload_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: "classmatch.db".to_string(),
            upload_limit: 5,
            upload_window_secs: 60,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e: T::Err| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_load_default_and_invalid() {
        let port: u16 = try_load("CLASSMATCH_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);

        let bad: Result<u16> = try_load("CLASSMATCH_TEST_UNSET_BAD", "not-a-port");
        assert!(bad.is_err());
    }

    #[test]
    fn test_upload_policy() {
        let policy = Config::default().upload_policy();
        assert_eq!(policy.limit, 5);
        assert_eq!(policy.window, chrono::Duration::seconds(60));
    }
}
