//! Model adapter error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("missing API key for {provider}. Set one of: {}", env_vars.join(", "))]
    MissingApiKey {
        provider: String,
        env_vars: Vec<String>,
    },

    #[error("API error: {0}")]
    Api(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },

    #[error("context overflow: {used} > {limit}")]
    ContextOverflow { used: u32, limit: u32 },

    #[error("cancelled")]
    Cancelled,
}
