//! Election registry.
//!
//! [`ElectionRegistry`] is the in-memory set of elections the node takes part
//! in, unique by id. [`RegistryStore`] persists it as one snapshot, rewritten
//! whole on every save.

pub mod error;
pub mod file;
pub mod registry;

pub use error::RegistryError;
pub use file::JsonFileStore;
pub use registry::ElectionRegistry;

/// Durable storage for the registry snapshot.
pub trait RegistryStore: Send + Sync {
    /// Read the snapshot. A store that has never been written yields an
    /// empty registry.
    fn load(&self) -> Result<ElectionRegistry, RegistryError>;

    /// Replace the snapshot with `registry`.
    fn save(&self, registry: &ElectionRegistry) -> Result<(), RegistryError>;
}
