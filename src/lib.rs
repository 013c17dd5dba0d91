//! `resilient-fetch` wraps HTTP requests in bounded exponential-backoff
//! retries and reports every retry through a leveled structured logger.
//!
//! - [`fetch_with_retry`] — the retry loop over any [`Transport`]
//! - [`Fetcher`] — a cloneable client holding a transport, policy and logger
//! - [`Logger`] — component-scoped logging with one sink per level

mod client;
mod config;
mod error;
mod logger;
mod options;
mod retry;
mod transport;
mod value;

pub use client::{Fetcher, FETCH_COMPONENT};
pub use config::{LogLevel, LoggerConfig, RuntimeMode};
pub use error::FetchError;
pub use logger::{
    default_logger, Clock, LogContext, LogRecord, LogSink, Logger, MemorySink, TracingSink,
};
pub use options::{RetryPolicy, DEFAULT_RETRYABLE_STATUSES};
pub use retry::{backoff_delay, fetch_with_retry, RETRY_ACTION};
pub use transport::{HttpResponse, HttpTransport, RequestConfig, Transport};
pub use value::{metadata, MetaValue, Metadata};

pub type Result<T> = std::result::Result<T, FetchError>;
