//! Token amounts.
//!
//! Amounts are carried as nano-tokens in a `u128` so stake arithmetic never
//! touches floating point. One token is 10^9 nano-tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::TypesError;

/// An amount of nano-tokens.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NanoTokens(u128);

impl NanoTokens {
    pub const ZERO: Self = Self(0);

    /// Nano-tokens per whole token.
    pub const PER_TOKEN: u128 = 1_000_000_000;

    pub const fn new(nano: u128) -> Self {
        Self(nano)
    }

    /// Whole tokens to nano-tokens, saturating on overflow.
    pub const fn from_tokens(tokens: u128) -> Self {
        Self(tokens.saturating_mul(Self::PER_TOKEN))
    }

    pub const fn nano(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Integer division, used to split a balance evenly across a batch.
    pub fn split(self, parts: usize) -> Self {
        if parts == 0 {
            return self;
        }
        Self(self.0 / parts as u128)
    }

    /// Parse a human token amount such as `"10"` or `"12.5"` (at most nine
    /// fractional digits).
    pub fn parse_tokens(s: &str) -> Result<Self, TypesError> {
        let s = s.trim();
        let invalid = || TypesError::InvalidAmount(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > 9 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac_nano: u128 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<9}").parse().map_err(|_| invalid())?
        };
        whole
            .checked_mul(Self::PER_TOKEN)
            .and_then(|n| n.checked_add(frac_nano))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl Add for NanoTokens {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for NanoTokens {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for NanoTokens {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl From<u128> for NanoTokens {
    fn from(nano: u128) -> Self {
        Self(nano)
    }
}

impl FromStr for NanoTokens {
    type Err = TypesError;

    /// Parses a raw nano-token integer, as reported by chain tooling. Hex
    /// values with a `0x` prefix are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x") {
            Some(hex) => u128::from_str_radix(hex, 16),
            None => s.parse(),
        };
        parsed
            .map(Self)
            .map_err(|_| TypesError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for NanoTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::PER_TOKEN;
        let frac = self.0 % Self::PER_TOKEN;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let frac = format!("{frac:09}");
            write!(f, "{whole}.{}", frac.trim_end_matches('0'))
        }
    }
}
