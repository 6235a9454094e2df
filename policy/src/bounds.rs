//! Protocol stake bounds.

use stakeward_types::{NanoTokens, StakeBounds};

/// Outcome of checking a bid against [`StakeBounds`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeDecision {
    /// Within bounds, unchanged.
    Accepted(NanoTokens),
    /// Above the maximum; reduced to it.
    Reduced { requested: NanoTokens, amount: NanoTokens },
    /// Below the minimum; no bid should be made.
    Rejected { requested: NanoTokens, min_stake: NanoTokens },
}

impl StakeDecision {
    pub fn accepted(&self) -> bool {
        !matches!(self, StakeDecision::Rejected { .. })
    }

    /// The amount to bid (the requested amount when rejected).
    pub fn amount(&self) -> NanoTokens {
        match *self {
            StakeDecision::Accepted(amount) => amount,
            StakeDecision::Reduced { amount, .. } => amount,
            StakeDecision::Rejected { requested, .. } => requested,
        }
    }
}

/// Check `amount` against the protocol stake bounds.
pub fn clamp_to_protocol_bounds(amount: NanoTokens, bounds: &StakeBounds) -> StakeDecision {
    if amount < bounds.min_stake {
        StakeDecision::Rejected {
            requested: amount,
            min_stake: bounds.min_stake,
        }
    } else if amount > bounds.max_stake {
        StakeDecision::Reduced {
            requested: amount,
            amount: bounds.max_stake,
        }
    } else {
        StakeDecision::Accepted(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> StakeBounds {
        StakeBounds {
            min_stake: NanoTokens::new(10_000_000_000),
            max_stake: NanoTokens::new(500_000_000_000),
        }
    }

    #[test]
    fn within_bounds_passes_through() {
        let d = clamp_to_protocol_bounds(NanoTokens::new(300_000_000_000), &bounds());
        assert_eq!(d, StakeDecision::Accepted(NanoTokens::new(300_000_000_000)));
        assert!(d.accepted());
    }

    #[test]
    fn above_max_is_reduced() {
        let d = clamp_to_protocol_bounds(NanoTokens::new(600_000_000_000), &bounds());
        assert!(d.accepted());
        assert_eq!(d.amount(), NanoTokens::new(500_000_000_000));
    }

    #[test]
    fn below_min_is_rejected() {
        let d = clamp_to_protocol_bounds(NanoTokens::new(9_999_999_999), &bounds());
        assert!(!d.accepted());
    }

    #[test]
    fn exact_bounds_are_accepted() {
        assert!(clamp_to_protocol_bounds(bounds().min_stake, &bounds()).accepted());
        assert_eq!(
            clamp_to_protocol_bounds(bounds().max_stake, &bounds()),
            StakeDecision::Accepted(bounds().max_stake)
        );
    }
}
