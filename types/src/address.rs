//! Chain account addresses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix families an address can be rendered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    /// `-1:`, masterchain, where the elector lives.
    MasterChain,
    /// `0:`, basic workchain.
    WorkChain,
    /// `0x`, bare hex form expected by some getters.
    Hex,
}

impl AddressKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            AddressKind::MasterChain => "-1:",
            AddressKind::WorkChain => "0:",
            AddressKind::Hex => "0x",
        }
    }
}

/// An account address as reported by chain tooling.
///
/// Stored verbatim; use [`Address::with_kind`] to normalise the prefix when
/// an address crosses into a call that expects a specific form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The account id with any known prefix removed.
    pub fn account_id(&self) -> &str {
        let s = self.0.as_str();
        for prefix in ["-1:", "0:", "0x"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return rest;
            }
        }
        s
    }

    /// Re-render with the prefix for `kind`, dropping whatever prefix was there.
    pub fn with_kind(&self, kind: AddressKind) -> Self {
        Self(format!("{}{}", kind.prefix(), self.account_id()))
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> String {
        let id = self.account_id();
        if id.len() <= 12 {
            return self.0.clone();
        }
        format!("{}..{}", &id[..6], &id[id.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_kind_replaces_masterchain_prefix() {
        let addr = Address::new("-1:3333");
        assert_eq!(addr.with_kind(AddressKind::Hex).as_str(), "0x3333");
        assert_eq!(addr.with_kind(AddressKind::MasterChain).as_str(), "-1:3333");
    }

    #[test]
    fn with_kind_adds_prefix_to_bare_id() {
        let addr = Address::new("abcd");
        assert_eq!(addr.with_kind(AddressKind::MasterChain).as_str(), "-1:abcd");
    }

    #[test]
    fn workchain_prefix_is_stripped() {
        let addr = Address::new("0:ff");
        assert_eq!(addr.account_id(), "ff");
    }

    #[test]
    fn short_abbreviates_long_ids() {
        let addr = Address::new(format!("0:{}", "a".repeat(64)));
        assert_eq!(addr.short(), "aaaaaa..aaaa");
    }
}
