//! Prudent election gating.
//!
//! A prudent bid waits until shortly before the election closes and is only
//! made when it would beat a given share of the stakes already submitted.

use serde::{Deserialize, Serialize};

use stakeward_types::{Election, NanoTokens, Timestamp};

use crate::PolicyError;

/// Prudent election settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrudentGate {
    /// Only join within this many seconds of the election closing.
    #[serde(default)]
    pub election_end_join_offset: Option<u64>,

    /// Percentage of competitor stakes (among the top slots) that must be
    /// lower than ours.
    #[serde(default)]
    pub join_threshold: u8,
}

impl PrudentGate {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.join_threshold > 100 {
            return Err(PolicyError::InvalidThreshold(self.join_threshold));
        }
        Ok(())
    }

    /// Whether a bid of `candidate` should be made now.
    ///
    /// `competitors` should already be narrowed with [`top_competitors`].
    pub fn admits(
        &self,
        election: &Election,
        now: Timestamp,
        candidate: NanoTokens,
        max_validator_slots: usize,
        competitors: &[NanoTokens],
    ) -> bool {
        if competitors.is_empty() {
            return true;
        }
        if let (Some(offset), Some(to_close)) = (
            self.election_end_join_offset,
            election.seconds_to_close(now),
        ) {
            if to_close > offset as i64 {
                return false;
            }
        }
        if competitors.len() < max_validator_slots {
            return true;
        }
        let lower = competitors.iter().filter(|s| **s < candidate).count();
        // lower / total * 100 >= threshold, without the division
        lower * 100 >= self.join_threshold as usize * competitors.len()
    }
}

/// The `n` largest stakes, sorted descending.
pub fn top_competitors(mut stakes: Vec<NanoTokens>, n: usize) -> Vec<NanoTokens> {
    stakes.sort_unstable_by(|a, b| b.cmp(a));
    stakes.truncate(n);
    stakes
}
