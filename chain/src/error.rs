use thiserror::Error;

/// Failure of a chain collaborator call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The node or network could not be reached. Callers retry soon.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The call ran and failed.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The call succeeded but its output could not be understood.
    #[error("unexpected response: {0}")]
    Data(String),

    #[error("secret unavailable: {0}")]
    Secret(String),
}

impl ChainError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ChainError::Connectivity(_))
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::Data(e.to_string())
    }
}
