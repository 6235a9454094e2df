//! Fundamental types for stakeward.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! the persisted election record, token amounts, chain addresses, and time.

pub mod address;
pub mod amount;
pub mod election;
pub mod error;
pub mod params;
pub mod time;

pub use address::{Address, AddressKind};
pub use amount::NanoTokens;
pub use election::{
    Election, ElectionId, ElectionMode, ElectionParams, ElectionPhase, ValidatorKeys,
};
pub use error::TypesError;
pub use params::{StakeBounds, ValidatorSetParams};
pub use time::{Clock, SystemClock, Timestamp};
