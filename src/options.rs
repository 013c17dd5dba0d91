use std::collections::BTreeSet;

use serde::Deserialize;

/// Configures retry and backoff behavior for one logical fetch.
///
/// Partial overrides use struct update syntax:
///
/// ```
/// use resilient_fetch::RetryPolicy;
///
/// let policy = RetryPolicy { max_retries: 2, ..RetryPolicy::default() };
/// assert_eq!(policy.base_delay_ms, 1_000);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub base_delay_ms: u64,
    /// Response statuses treated as transient.
    pub retryable_statuses: BTreeSet<u16>,
}

/// Statuses retried when no override is given.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Upper bound on attempts for one call.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Reads a policy from the environment, keeping defaults for unset variables.
    ///
    /// Reads:
    /// - `FETCH_MAX_RETRIES` — retries after the first attempt
    /// - `FETCH_BASE_DELAY_MS` — base backoff in milliseconds
    /// - `FETCH_RETRYABLE_STATUSES` — comma-separated status codes, e.g. `500,503`
    ///
    /// **Not available on `wasm32` targets.**
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut policy = Self::default();
        if let Some(value) = non_empty(lookup("FETCH_MAX_RETRIES")) {
            policy.max_retries = parse_number("FETCH_MAX_RETRIES", &value)?;
        }
        if let Some(value) = non_empty(lookup("FETCH_BASE_DELAY_MS")) {
            policy.base_delay_ms = parse_number("FETCH_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = non_empty(lookup("FETCH_RETRYABLE_STATUSES")) {
            policy.retryable_statuses = value
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(|code| parse_number::<u16>("FETCH_RETRYABLE_STATUSES", code))
                .collect::<crate::Result<_>>()?;
        }
        Ok(policy)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> crate::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| crate::FetchError::Config(format!("{key} has invalid value '{value}'")))
}
