//! Stake expressions: how much of the available funds to bid.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use stakeward_types::NanoTokens;

use crate::PolicyError;

/// Percentages are held as fixed-point with four fractional digits.
const PERCENT_SCALE: u128 = 10_000;
const PERCENT_SCALE_DIGITS: usize = 4;

/// Configured stake setting, e.g. `"30%"` or `"10000"` (tokens).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StakeExpression {
    /// Percentage of the base amount, scaled by 10^4 (`30%` is `300_000`).
    Percent(u128),
    /// Fixed amount, capped at the base amount.
    Absolute(NanoTokens),
}

impl StakeExpression {
    pub fn percent(pct: u128) -> Self {
        StakeExpression::Percent(pct * PERCENT_SCALE)
    }

    /// Bid size for `base`.
    ///
    /// Percentages round down to whole nano-tokens; absolute amounts never
    /// exceed `base`.
    pub fn apply(&self, base: NanoTokens) -> NanoTokens {
        match *self {
            StakeExpression::Percent(scaled) => {
                let denom = 100 * PERCENT_SCALE;
                let amount = match base.nano().checked_mul(scaled) {
                    Some(product) => product / denom,
                    None => base.nano() / denom * scaled,
                };
                NanoTokens::new(amount)
            }
            StakeExpression::Absolute(amount) => base.min(amount),
        }
    }
}

/// Bid size for `base` under `expression`; see [`StakeExpression::apply`].
pub fn compute_stake(base: NanoTokens, expression: &StakeExpression) -> NanoTokens {
    expression.apply(base)
}

impl FromStr for StakeExpression {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || PolicyError::InvalidExpression(s.to_string());
        if let Some(pct) = trimmed.strip_suffix('%') {
            let pct = pct.trim();
            let (whole, frac) = pct.split_once('.').unwrap_or((pct, ""));
            if whole.is_empty()
                || !whole.chars().all(|c| c.is_ascii_digit())
                || !frac.chars().all(|c| c.is_ascii_digit())
                || frac.len() > PERCENT_SCALE_DIGITS
            {
                return Err(invalid());
            }
            let whole: u128 = whole.parse().map_err(|_| invalid())?;
            let frac: u128 = if frac.is_empty() {
                0
            } else {
                format!("{frac:0<width$}", width = PERCENT_SCALE_DIGITS)
                    .parse()
                    .map_err(|_| invalid())?
            };
            let scaled = whole * PERCENT_SCALE + frac;
            if scaled > 100 * PERCENT_SCALE {
                return Err(PolicyError::PercentageOutOfRange(pct.to_string()));
            }
            return Ok(StakeExpression::Percent(scaled));
        }
        NanoTokens::parse_tokens(trimmed)
            .map(StakeExpression::Absolute)
            .map_err(|_| invalid())
    }
}

impl TryFrom<String> for StakeExpression {
    type Error = PolicyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<StakeExpression> for String {
    fn from(e: StakeExpression) -> Self {
        e.to_string()
    }
}

impl fmt::Display for StakeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StakeExpression::Percent(scaled) => {
                let whole = scaled / PERCENT_SCALE;
                let frac = scaled % PERCENT_SCALE;
                if frac == 0 {
                    write!(f, "{whole}%")
                } else {
                    let frac = format!("{frac:0width$}", width = PERCENT_SCALE_DIGITS);
                    write!(f, "{whole}.{}%", frac.trim_end_matches('0'))
                }
            }
            StakeExpression::Absolute(amount) => write!(f, "{amount}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_percent_of_a_thousand_tokens() {
        let expr: StakeExpression = "30%".parse().unwrap();
        let stake = compute_stake(NanoTokens::new(1_000_000_000_000), &expr);
        assert_eq!(stake, NanoTokens::new(300_000_000_000));
    }

    #[test]
    fn fractional_percent_rounds_down() {
        let expr: StakeExpression = "12.5%".parse().unwrap();
        assert_eq!(expr.apply(NanoTokens::new(7)), NanoTokens::new(0));
        assert_eq!(expr.apply(NanoTokens::new(1000)), NanoTokens::new(125));
    }

    #[test]
    fn absolute_is_capped_by_base() {
        let expr: StakeExpression = "10".parse().unwrap();
        assert_eq!(expr, StakeExpression::Absolute(NanoTokens::from_tokens(10)));
        assert_eq!(expr.apply(NanoTokens::from_tokens(4)), NanoTokens::from_tokens(4));
        assert_eq!(expr.apply(NanoTokens::from_tokens(40)), NanoTokens::from_tokens(10));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for bad in ["", "%", "abc", "30%%", "-5%", "1.23456%", "ten tokens"] {
            assert!(bad.parse::<StakeExpression>().is_err(), "{bad:?} parsed");
        }
    }

    #[test]
    fn percent_above_hundred_is_rejected() {
        assert_eq!(
            "150%".parse::<StakeExpression>(),
            Err(PolicyError::PercentageOutOfRange("150".into()))
        );
    }

    #[test]
    fn display_round_trips() {
        for s in ["30%", "12.5%", "100%", "10", "0.5"] {
            let expr: StakeExpression = s.parse().unwrap();
            assert_eq!(expr.to_string(), s);
        }
    }

    #[test]
    fn huge_base_does_not_overflow() {
        let expr = StakeExpression::percent(50);
        let base = NanoTokens::new(u128::MAX / 2);
        assert!(expr.apply(base) > NanoTokens::ZERO);
    }
}
