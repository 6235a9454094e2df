//! Wallet secrets.

use serde::Deserialize;
use std::fmt;
use zeroize::Zeroizing;

use stakeward_types::Address;

use crate::ChainError;

/// A signing seed phrase. Wiped on drop, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed(Zeroizing<String>);

impl Seed {
    pub fn new(phrase: impl Into<String>) -> Self {
        let raw = Zeroizing::new(phrase.into());
        Self(Zeroizing::new(raw.trim().to_string()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(***)")
    }
}

/// Source of the validator wallet address and the seeds that sign for it.
pub trait SecretProvider: Send + Sync {
    fn validator_address(&self) -> Result<Address, ChainError>;

    fn validator_seed(&self) -> Result<Seed, ChainError>;

    /// Seeds of the other custodians whose confirmations are automated.
    fn custodian_seeds(&self) -> Result<Vec<Seed>, ChainError>;
}

#[derive(Deserialize)]
struct SecretsDocument {
    validator_address: String,
    validator_seed: String,
    #[serde(default)]
    custodian_seeds: Vec<String>,
}

/// Secrets read from a JSON document held in an environment variable:
///
/// ```json
/// {"validator_address": "0:…", "validator_seed": "…", "custodian_seeds": ["…"]}
/// ```
pub struct EnvSecretProvider {
    address: Address,
    seed: Seed,
    custodians: Vec<Seed>,
}

impl EnvSecretProvider {
    pub fn from_env(var: &str) -> Result<Self, ChainError> {
        let raw = Zeroizing::new(
            std::env::var(var)
                .map_err(|_| ChainError::Secret(format!("environment variable {var} is not set")))?,
        );
        Self::from_json(raw.trim().trim_matches('\''))
    }

    pub fn from_json(raw: &str) -> Result<Self, ChainError> {
        let doc: SecretsDocument = serde_json::from_str(raw)
            .map_err(|e| ChainError::Secret(format!("malformed secrets document: {e}")))?;
        if doc.validator_address.trim().is_empty() {
            return Err(ChainError::Secret("validator_address is empty".into()));
        }
        if doc.validator_seed.trim().is_empty() {
            return Err(ChainError::Secret("validator_seed is empty".into()));
        }
        Ok(Self {
            address: Address::new(doc.validator_address),
            seed: Seed::new(doc.validator_seed),
            custodians: doc.custodian_seeds.into_iter().map(Seed::new).collect(),
        })
    }
}

impl SecretProvider for EnvSecretProvider {
    fn validator_address(&self) -> Result<Address, ChainError> {
        Ok(self.address.clone())
    }

    fn validator_seed(&self) -> Result<Seed, ChainError> {
        Ok(self.seed.clone())
    }

    fn custodian_seeds(&self) -> Result<Vec<Seed>, ChainError> {
        Ok(self.custodians.clone())
    }
}
