use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::FetchError;

/// Log severity, ordered `Debug < Info < Warn < Error`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    /// Upper-case name as it appears in a formatted line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    pub const fn priority(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(FetchError::Config(format!("unknown log level '{other}'"))),
        }
    }
}

/// Deployment mode of the host application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl RuntimeMode {
    /// Lowest level emitted in this mode.
    pub const fn threshold(self) -> LogLevel {
        match self {
            Self::Development => LogLevel::Debug,
            Self::Production => LogLevel::Warn,
        }
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Logger settings shared by every component logger of a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Messages below this level are dropped before formatting.
    pub threshold: LogLevel,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::for_mode(RuntimeMode::Development)
    }
}

impl LoggerConfig {
    pub fn for_mode(mode: RuntimeMode) -> Self {
        Self {
            threshold: mode.threshold(),
        }
    }

    /// Reads logger settings from the environment.
    ///
    /// Reads:
    /// - `APP_ENV` — `production` (or `prod`) selects the warn threshold,
    ///   anything else (or unset) selects debug
    /// - `LOG_LEVEL` — optional explicit threshold overriding `APP_ENV`
    ///
    /// **Not available on `wasm32` targets** — environment variables do not
    /// exist in browser runtimes. Use [`LoggerConfig::for_mode`] instead.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> crate::Result<Self> {
        let mode = std::env::var("APP_ENV")
            .map(|value| RuntimeMode::parse(&value))
            .unwrap_or_default();
        Self::resolve(mode, std::env::var("LOG_LEVEL").ok().as_deref())
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    fn resolve(mode: RuntimeMode, level: Option<&str>) -> crate::Result<Self> {
        let threshold = match level.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => value.parse::<LogLevel>()?,
            None => mode.threshold(),
        };
        Ok(Self { threshold })
    }
}
