use std::{fmt, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Method,
};
use serde::Serialize;

use crate::{FetchError, Result};

/// A received response, whatever its status.
pub trait HttpResponse {
    /// Numeric status code.
    fn status(&self) -> u16;

    /// `true` for 2xx statuses.
    fn ok(&self) -> bool {
        (200..300).contains(&self.status())
    }
}

impl HttpResponse for reqwest::Response {
    fn status(&self) -> u16 {
        reqwest::Response::status(self).as_u16()
    }
}

/// Performs exactly one request attempt.
///
/// `send` resolves with `Ok` whenever any response came back (including
/// 4xx/5xx) and with `Err` only when no response was obtained.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Resource identifier, passed through unmodified.
    type Target: fmt::Display + ?Sized;
    /// Per-request options, passed through unmodified.
    type Config;
    type Response: HttpResponse;
    type Error: fmt::Display;

    async fn send(
        &self,
        target: &Self::Target,
        config: Option<&Self::Config>,
    ) -> std::result::Result<Self::Response, Self::Error>;
}

/// Method, headers, body and timeout for one request made by [`HttpTransport`].
#[derive(Clone, Debug, Default)]
pub struct RequestConfig {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Per-attempt timeout in milliseconds. `None` keeps the client default.
    pub timeout_ms: Option<u64>,
}

impl RequestConfig {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `payload` as the body and sets `Content-Type: application/json`.
    pub fn with_json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self> {
        let body = serde_json::to_vec(payload).map_err(FetchError::InvalidBody)?;
        Ok(self
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body))
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (proxy, default headers, TLS settings).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    type Target = str;
    type Config = RequestConfig;
    type Response = reqwest::Response;
    type Error = FetchError;

    async fn send(&self, target: &str, config: Option<&RequestConfig>) -> Result<reqwest::Response> {
        let Some(config) = config else {
            return self.http.get(target).send().await.map_err(FetchError::Transport);
        };

        // On WASM, reqwest uses AbortController for timeout; `.timeout()` is
        // available on both targets.
        let mut request = self
            .http
            .request(config.method.clone(), target)
            .headers(config.headers.clone());
        if let Some(body) = &config.body {
            request = request.body(body.clone());
        }
        if let Some(timeout_ms) = config.timeout_ms {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }
        request.send().await.map_err(FetchError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{header::CONTENT_TYPE, Method};
    use serde_json::json;

    use super::{HttpResponse, RequestConfig};

    struct Status(u16);

    impl HttpResponse for Status {
        fn status(&self) -> u16 {
            self.0
        }
    }

    #[test]
    fn ok_covers_only_2xx() {
        assert!(Status(200).ok());
        assert!(Status(204).ok());
        assert!(!Status(304).ok());
        assert!(!Status(404).ok());
        assert!(!Status(503).ok());
    }

    #[test]
    fn json_config_sets_body_and_content_type() {
        let config = RequestConfig::new(Method::POST)
            .with_json(&json!({"name": "Kit"}))
            .expect("json body must serialize")
            .with_timeout_ms(500);

        assert_eq!(config.method, Method::POST);
        assert_eq!(config.headers[CONTENT_TYPE], "application/json");
        assert_eq!(config.body.as_deref(), Some(br#"{"name":"Kit"}"#.as_slice()));
        assert_eq!(config.timeout_ms, Some(500));
    }

    #[test]
    fn default_config_is_plain_get() {
        let config = RequestConfig::default();
        assert_eq!(config.method, Method::GET);
        assert!(config.headers.is_empty());
        assert!(config.body.is_none());
    }
}
