//! Stake policy: pure functions deciding how much to bid and whether to bid.
//!
//! - [`StakeExpression`] turns the configured stake setting (`"30%"` or an
//!   absolute token amount) into a nano-token bid for a given base amount.
//! - [`clamp_to_protocol_bounds`] applies the protocol's min/max stake.
//! - [`PrudentGate`] delays or refuses a bid depending on how competitive it
//!   would be against the stakes already submitted.

pub mod bounds;
pub mod error;
pub mod expression;
pub mod prudent;

pub use bounds::{clamp_to_protocol_bounds, StakeDecision};
pub use stakeward_types::StakeBounds;
pub use error::PolicyError;
pub use expression::{compute_stake, StakeExpression};
pub use prudent::{top_competitors, PrudentGate};
