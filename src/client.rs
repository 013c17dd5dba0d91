use std::fmt;

use crate::{
    retry::fetch_with_retry, HttpTransport, Logger, RequestConfig, Result, RetryPolicy, Transport,
};

/// Component name used by a [`Fetcher`]'s default logger.
pub const FETCH_COMPONENT: &str = "fetch_with_retry";

/// Retrying HTTP client: a transport, a default [`RetryPolicy`] and a [`Logger`].
///
/// Cloning is cheap when the transport is (the default `reqwest` client is
/// reference counted), and clones share nothing mutable.
#[derive(Clone)]
pub struct Fetcher<T = HttpTransport> {
    transport: T,
    policy: RetryPolicy,
    logger: Logger,
}

impl<T> fmt::Debug for Fetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("policy", &self.policy)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

impl Default for Fetcher<HttpTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher<HttpTransport> {
    /// Creates a fetcher over a fresh `reqwest::Client` with the default policy.
    pub fn new() -> Self {
        Self::with_transport(HttpTransport::new())
    }

    /// Creates a fetcher configured from environment variables.
    ///
    /// See [`RetryPolicy::from_env`] and [`crate::LoggerConfig::from_env`]
    /// for the variables read. Unset variables keep their defaults.
    ///
    /// **Not available on `wasm32` targets.**
    ///
    /// # Example
    ///
    /// ```no_run
    /// use resilient_fetch::Fetcher;
    ///
    /// let fetcher = Fetcher::from_env().expect("invalid FETCH_* / LOG_LEVEL values");
    /// ```
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self> {
        let policy = RetryPolicy::from_env()?;
        let log_config = crate::LoggerConfig::from_env()?;
        Ok(Self::new()
            .with_policy(policy)
            .with_logger(Logger::with_config(FETCH_COMPONENT, &log_config)))
    }

    /// `GET url` with the fetcher's policy.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.fetch(url, None).await
    }

    /// `POST url` with a JSON body.
    pub async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let config = RequestConfig::new(reqwest::Method::POST).with_json(body)?;
        self.fetch(url, Some(&config)).await
    }
}

impl<T: Transport> Fetcher<T> {
    /// Creates a fetcher over any [`Transport`].
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            logger: Logger::new(FETCH_COMPONENT),
        }
    }

    /// Replaces the policy used by [`Fetcher::fetch`].
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the logger that receives retry warnings.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches `target` using the fetcher's policy.
    pub async fn fetch(
        &self,
        target: &T::Target,
        config: Option<&T::Config>,
    ) -> std::result::Result<T::Response, T::Error> {
        self.fetch_with_policy(target, config, &self.policy).await
    }

    /// Fetches `target` with a per-call policy instead of the default one.
    pub async fn fetch_with_policy(
        &self,
        target: &T::Target,
        config: Option<&T::Config>,
        policy: &RetryPolicy,
    ) -> std::result::Result<T::Response, T::Error> {
        fetch_with_retry(&self.transport, target, config, policy, &self.logger).await
    }
}
