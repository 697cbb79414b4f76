use thiserror::Error;

/// The seven-kind taxonomy shared by the path gate and every tool. A tool
/// never throws outside this set; whatever goes wrong is classified into
/// one of these before it leaves the tool boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    PolicyDenied(String),
    #[error("{0}")]
    NotFound(String),
    #[error("cancelled")]
    Cancelled,
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Upstream(String),
}

impl ToolError {
    /// Fixed label used in protocol frames and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::ValidationError(_) => "ValidationError",
            ToolError::PolicyDenied(_) => "PolicyDenied",
            ToolError::NotFound(_) => "NotFound",
            ToolError::Cancelled => "Cancelled",
            ToolError::Timeout(_) => "Timeout",
            ToolError::Rejected(_) => "Rejected",
            ToolError::Upstream(_) => "Upstream",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("model error: {0}")]
    Model(#[from] crate::provider::ModelError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("session error: {0}")]
    Session(String),

    #[error("agent error: {0}")]
    Agent(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
