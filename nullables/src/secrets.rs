use stakeward_chain::{ChainError, SecretProvider, Seed};
use stakeward_types::Address;

/// Fixed wallet address and seeds.
pub struct NullSecrets {
    address: Address,
    seed: String,
    custodians: Vec<String>,
}

impl NullSecrets {
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            seed: "validator seed".into(),
            custodians: Vec::new(),
        }
    }

    pub fn with_custodians(mut self, seeds: &[&str]) -> Self {
        self.custodians = seeds.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl SecretProvider for NullSecrets {
    fn validator_address(&self) -> Result<Address, ChainError> {
        Ok(self.address.clone())
    }

    fn validator_seed(&self) -> Result<Seed, ChainError> {
        Ok(Seed::new(self.seed.as_str()))
    }

    fn custodian_seeds(&self) -> Result<Vec<Seed>, ChainError> {
        Ok(self.custodians.iter().map(|s| Seed::new(s.as_str())).collect())
    }
}
