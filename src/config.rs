use std::{env, num::ParseIntError};

use thiserror::Error;

/// AppConfig
///
/// The service's whole configuration, loaded once at startup and shared immutably
/// through `AppState` (pulled into handlers via `FromRef`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    // Runtime environment marker. Selects the log format.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Lenient seller rule: any token may enter seller routes and the role is rewritten.
    pub seller_auto_promote: bool,
    // Fall back to the old `token` storage key when `access_token` is absent.
    pub legacy_token_key: bool,
    // Redirect hops followed before navigation is declared a loop.
    pub max_redirects: usize,
}

/// Env
///
/// Local runs log human-readable output; production emits JSON for log aggregation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Env {
    pub fn as_str(self) -> &'static str {
        match self {
            Env::Local => "local",
            Env::Production => "production",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a boolean (true/false, 1/0, yes/no, on/off), got `{value}`")]
    InvalidFlag { var: &'static str, value: String },

    #[error("{var} must be a non-negative integer, got `{value}`")]
    InvalidNumber {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe values for test state scaffolding; no environment variables needed.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "0.0.0.0:3000".to_string(),
            seller_auto_promote: false,
            legacy_token_key: true,
            max_redirects: 5,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, falling back to the
    /// defaults for anything unset:
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `APP_ENV` | `local` (`production` switches to JSON logs) |
    /// | `BIND_ADDR` | `0.0.0.0:3000` |
    /// | `GUARD_SELLER_AUTO_PROMOTE` | `false` |
    /// | `GUARD_LEGACY_TOKEN_KEY` | `true` |
    /// | `GUARD_MAX_REDIRECTS` | `5` |
    ///
    /// Malformed values are errors rather than silently defaulted.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        Ok(Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            seller_auto_promote: flag("GUARD_SELLER_AUTO_PROMOTE", defaults.seller_auto_promote)?,
            legacy_token_key: flag("GUARD_LEGACY_TOKEN_KEY", defaults.legacy_token_key)?,
            max_redirects: number("GUARD_MAX_REDIRECTS", defaults.max_redirects)?,
        })
    }
}

fn flag(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Ok(value) = env::var(var) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { var, value }),
    }
}

fn number(var: &'static str, default: usize) -> Result<usize, ConfigError> {
    let Ok(value) = env::var(var) else {
        return Ok(default);
    };
    let parsed = value.trim().parse::<usize>();
    parsed.map_err(|source| ConfigError::InvalidNumber { var, value, source })
}
