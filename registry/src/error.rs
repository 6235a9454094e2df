use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("registry snapshot is corrupted: {0}")]
    Corruption(String),
}
