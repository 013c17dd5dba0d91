/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No response was obtained: connection, DNS, timeout or body error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Request body could not be serialized to JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    /// Invalid configuration value (environment variable or level name).
    #[error("config error: {0}")]
    Config(String),
}

impl FetchError {
    /// Returns `true` when the error means no response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
