use thiserror::Error;

use stakeward_chain::ChainError;
use stakeward_types::ElectionId;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("registry error: {0}")]
    Registry(#[from] stakeward_registry::RegistryError),

    #[error("stake policy error: {0}")]
    Policy(#[from] stakeward_policy::PolicyError),

    #[error("election record error: {0}")]
    Election(#[from] stakeward_types::TypesError),

    /// A bid failed part-way. Keys generated for it have been released.
    #[error("bid for election {election_id} failed: {source}")]
    PartialSubmission {
        election_id: ElectionId,
        #[source]
        source: ChainError,
    },

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("logging error: {0}")]
    Logging(#[from] stakeward_utils::LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Whether the node or network was unreachable; such cycles retry soon.
    pub fn is_connectivity(&self) -> bool {
        match self {
            NodeError::Chain(e) | NodeError::PartialSubmission { source: e, .. } => {
                e.is_connectivity()
            }
            _ => false,
        }
    }
}

impl From<prometheus::Error> for NodeError {
    fn from(e: prometheus::Error) -> Self {
        NodeError::Metrics(e.to_string())
    }
}
