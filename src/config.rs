//! Config module contains the top-level config for the app.

use std::env;

use config_crate::{Config as RawConfig, ConfigError, Environment, File};

/// Basic settings - server, database and the lifecycle constants
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: Server,
    pub redemptions: Redemptions,
    pub sweeper: Sweeper,
    pub sentry: Option<SentryConfig>,
}

/// Common server settings
#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub host: String,
    pub port: String,
    pub database: String,
    pub thread_count: usize,
}

/// Redemption lifecycle settings
#[derive(Debug, Deserialize, Clone)]
pub struct Redemptions {
    /// Validity window of a pending redemption, seconds
    pub window_s: u64,
    /// Bounded retries on scan code collision before giving up
    pub max_code_attempts: u32,
}

/// Cleanup sweep settings
#[derive(Debug, Deserialize, Clone)]
pub struct Sweeper {
    /// Seconds between sweep runs
    pub interval_s: u64,
    pub thread_count: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SentryConfig {
    pub dsn: String,
}

impl Config {
    /// Creates config from base.toml, overwritten by <run_mode>.toml and
    /// after that by environment variables like REDEMPTIONS_SERVER_PORT.
    pub fn new() -> Result<Self, ConfigError> {
        let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut s = RawConfig::new();
        s.merge(File::with_name("config/base"))?;
        s.merge(File::with_name(&format!("config/{}", env)).required(false))?;

        s.merge(Environment::with_prefix("REDEMPTIONS").separator("_"))?;

        s.try_into()
    }
}
