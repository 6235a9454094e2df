//! Chain collaborators.
//!
//! The orchestration loop talks to the outside world through three traits:
//! [`ValidatorNode`] (keys, bid payloads, elector getters), [`Wallet`]
//! (multisig transfers and staking-pool calls), and [`SecretProvider`]
//! (wallet address and signing seeds). Every call is blocking and fails with a
//! [`ChainError`] that distinguishes connectivity loss from everything else.
//!
//! The [`tool`] module implements the traits on top of the node console and
//! wallet command-line binaries.

pub mod error;
pub mod models;
pub mod node;
pub mod secrets;
pub mod tool;
pub mod wallet;

pub use error::ChainError;
pub use models::{
    Account, PoolEvent, PoolEventKind, PoolInfo, RequestSignature, SyncLag, TransactionId,
};
pub use node::{BidRequest, ValidatorNode};
pub use secrets::{EnvSecretProvider, Seed, SecretProvider};
pub use wallet::{Transfer, Wallet};
