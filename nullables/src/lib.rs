//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator of the orchestration loop (clock, validator node,
//! wallet, secrets, telemetry, registry storage) has an in-memory
//! implementation here that:
//! - Returns values the test configured
//! - Records every call so tests can assert on side effects
//! - Can be told to fail a specific operation
//! - Never touches the filesystem, network, or a subprocess
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod secrets;
pub mod store;
pub mod telemetry;
pub mod validator;
pub mod wallet;

pub use clock::NullClock;
pub use secrets::NullSecrets;
pub use store::MemoryStore;
pub use telemetry::RecordingTelemetry;
pub use validator::{NodeOp, NullValidatorNode, SubmittedBid};
pub use wallet::{NullWallet, WalletOp};
