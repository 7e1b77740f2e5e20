//! Error types for the Strudel relay.

use thiserror::Error;

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Failure talking to a completion provider. Every variant is terminal for the
/// request that produced it: nothing is retried.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response parse failed: {0}")]
    Decode(String),

    #[error("invalid response format: missing {0} field")]
    MissingField(&'static str),

    #[error("upstream returned no completion text")]
    EmptyCompletion,
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Decode(err.to_string())
    }
}

/// Outcome of a relay call that did not update the code store.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Client input error; maps to HTTP 400.
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("preamble unavailable ({path}): {source}")]
    Preamble {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The validation hook refused the generated code.
    #[error("generated code rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RelayError {
    /// True when the caller sent a bad request (as opposed to a server-side failure).
    pub fn is_client_error(&self) -> bool {
        matches!(self, RelayError::InvalidInput(_))
    }
}

/// Writes to the code store.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("Code is required")]
    EmptyCode,
}

/// Submissions to the prompt queue.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("Prompt is required")]
    EmptyPrompt,
}

/// Startup configuration problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("unknown provider '{0}' (expected agent, vertex or mock)")]
    UnknownProvider(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
