//! Wallet command-line adapter.

use blake2::{Blake2s256, Digest};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use stakeward_types::{
    Address, AddressKind, ElectionId, ElectionParams, NanoTokens, StakeBounds,
    ValidatorSetParams,
};

use super::output;
use super::runner::ToolRunner;
use crate::{Account, ChainError, PoolEvent, PoolInfo, Seed, TransactionId, Transfer, Wallet};

const CONFIG_NAME: &str = "tonlabs-cli.conf.json";

#[derive(Clone, Debug)]
pub struct WalletCliConfig {
    pub exec_path: PathBuf,
    pub work_dir: PathBuf,
    pub network_url: String,
    /// Multisig wallet ABI.
    pub wallet_abi: PathBuf,
    pub depool_abi: Option<PathBuf>,
    /// Elector ABI. Without it the elector is queried with raw get-methods.
    pub elector_abi: Option<PathBuf>,
    pub timeout: Duration,
}

/// Drives the wallet CLI. Each network URL gets its own working directory
/// so the tool's config file never points at the wrong network.
pub struct WalletCli {
    runner: ToolRunner,
    network_url: String,
    wallet_abi: PathBuf,
    depool_abi: Option<PathBuf>,
    elector_abi: Option<PathBuf>,
}

impl WalletCli {
    pub fn new(config: WalletCliConfig) -> Self {
        let url_hash = hex::encode(Blake2s256::digest(config.network_url.as_bytes()));
        let cwd = config.work_dir.join(&url_hash[..16]);
        Self {
            runner: ToolRunner::new(config.exec_path, cwd, config.timeout),
            network_url: config.network_url,
            wallet_abi: config.wallet_abi,
            depool_abi: config.depool_abi,
            elector_abi: config.elector_abi,
        }
    }

    fn ensure_configured(&self) -> Result<(), ChainError> {
        let path = self.runner.cwd().join(CONFIG_NAME);
        if path.exists() {
            return Ok(());
        }
        tracing::info!(url = %self.network_url, "initialising wallet cli config");
        self.runner
            .run(&args(["config", "--url", &self.network_url]))?;
        if !path.exists() {
            return Err(ChainError::Execution(format!(
                "wallet cli did not create {}",
                path.display()
            )));
        }
        Ok(())
    }

    fn run(&self, args: Vec<String>) -> Result<String, ChainError> {
        self.ensure_configured()?;
        self.runner.run(&args)
    }

    fn run_signed(&self, mut args: Vec<String>, signer: &Seed) -> Result<String, ChainError> {
        self.ensure_configured()?;
        args.push("--sign".into());
        args.push(signer.expose().to_string());
        self.runner.run_redacted(&args, &[signer.expose()])
    }

    fn call_getter(
        &self,
        address: &Address,
        method: &str,
        params: &Value,
        abi: &Path,
    ) -> Result<Value, ChainError> {
        let out = self.run(args([
            "run",
            address.as_str(),
            method,
            &params.to_string(),
            "--abi",
            &abi.to_string_lossy(),
        ]))?;
        output::result_json(&out)
    }

    fn raw_getter(&self, address: &Address, method: &str, extra: &[&str]) -> Result<Value, ChainError> {
        let mut a = args(["runget", address.as_str(), method]);
        a.extend(extra.iter().map(|s| s.to_string()));
        let out = self.run(a)?;
        output::result_json(&out)
    }

    fn get_config(&self, param: u32) -> Result<String, ChainError> {
        self.run(args(["getconfig", &param.to_string()]))
    }

    pub fn elector_address(&self) -> Result<Address, ChainError> {
        output::elector_address(&self.get_config(1)?)
    }

    pub fn election_params(&self) -> Result<Option<ElectionParams>, ChainError> {
        output::election_params(&self.get_config(15)?)
    }

    pub fn validator_set_params(&self) -> Result<Option<ValidatorSetParams>, ChainError> {
        output::validator_set_params(&self.get_config(16)?)
    }

    pub fn stake_bounds(&self) -> Result<Option<StakeBounds>, ChainError> {
        output::stake_bounds(&self.get_config(17)?)
    }

    pub fn active_election_ids(&self, elector: &Address) -> Result<Vec<ElectionId>, ChainError> {
        let result = match &self.elector_abi {
            Some(abi) => self.call_getter(elector, "active_election_id", &json!({}), abi)?,
            None => self.raw_getter(elector, "active_election_id", &[])?,
        };
        output::active_election_ids(&result)
    }

    pub fn compute_returned_stake(
        &self,
        elector: &Address,
        validator: &Address,
    ) -> Result<Vec<NanoTokens>, ChainError> {
        let wallet = validator.with_kind(AddressKind::Hex);
        let result = match &self.elector_abi {
            Some(abi) => self.call_getter(
                elector,
                "compute_returned_stake",
                &json!({ "wallet_addr": wallet.as_str() }),
                abi,
            )?,
            None => self.raw_getter(elector, "compute_returned_stake", &[wallet.as_str()])?,
        };
        Ok(output::amounts(&result))
    }

    /// Stakes already submitted to the open election. Needs the elector ABI.
    pub fn participant_stakes(&self, elector: &Address) -> Result<Vec<NanoTokens>, ChainError> {
        let Some(abi) = &self.elector_abi else {
            tracing::warn!("elector ABI not configured, participant stakes unavailable");
            return Ok(Vec::new());
        };
        let result = self.call_getter(elector, "get", &json!({}), abi)?;
        Ok(output::participant_stakes(&result))
    }

    fn depool_abi(&self) -> Result<&Path, ChainError> {
        self.depool_abi
            .as_deref()
            .ok_or_else(|| ChainError::Execution("staking pool ABI is not configured".into()))
    }
}

impl Wallet for WalletCli {
    fn account(&self, address: &Address) -> Result<Account, ChainError> {
        let out = self.run(args(["account", address.as_str()]))?;
        output::account(address, &out)
    }

    fn submit_transaction(
        &self,
        transfer: &Transfer,
        signer: &Seed,
    ) -> Result<TransactionId, ChainError> {
        let body = json!({
            "dest": transfer.dest.as_str(),
            "value": transfer.value.nano().to_string(),
            "bounce": transfer.bounce,
            "allBalance": false,
            "payload": transfer.payload,
        });
        let out = self.run_signed(
            args([
                "call",
                transfer.from.as_str(),
                "submitTransaction",
                &body.to_string(),
                "--abi",
                &self.wallet_abi.to_string_lossy(),
            ]),
            signer,
        )?;
        let result = output::result_json(&out)?;
        let id = result
            .get("transId")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::Data(format!("no transId in {result}")))?;
        Ok(TransactionId(id.to_string()))
    }

    fn confirm_transaction(
        &self,
        wallet: &Address,
        id: &TransactionId,
        signer: &Seed,
    ) -> Result<(), ChainError> {
        let body = json!({ "transactionId": id.0 });
        self.run_signed(
            args([
                "call",
                wallet.as_str(),
                "confirmTransaction",
                &body.to_string(),
                "--abi",
                &self.wallet_abi.to_string_lossy(),
            ]),
            signer,
        )?;
        Ok(())
    }

    fn pool_events(&self, pool: &Address) -> Result<Vec<PoolEvent>, ChainError> {
        let out = self.run(args(["depool", "--addr", pool.as_str(), "events"]))?;
        output::pool_events(&out)
    }

    fn pool_info(&self, pool: &Address) -> Result<PoolInfo, ChainError> {
        let abi = self.depool_abi()?;
        let result = self.call_getter(pool, "getDePoolInfo", &json!({}), abi)?;
        output::pool_info(&result)
    }

    fn pool_replenish(
        &self,
        pool: &Address,
        wallet: &Address,
        amount: NanoTokens,
        signer: &Seed,
    ) -> Result<(), ChainError> {
        self.run_signed(
            args([
                "depool",
                "--addr",
                pool.as_str(),
                "replenish",
                "--value",
                &amount.to_string(),
                "--wallet",
                wallet.as_str(),
            ]),
            signer,
        )?;
        Ok(())
    }

    fn pool_ticktock(
        &self,
        pool: &Address,
        wallet: &Address,
        signer: &Seed,
    ) -> Result<(), ChainError> {
        self.run_signed(
            args([
                "depool",
                "--addr",
                pool.as_str(),
                "ticktock",
                "--wallet",
                wallet.as_str(),
            ]),
            signer,
        )?;
        Ok(())
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Writes a fake wallet tool that logs its arguments and prints `reply`.
    fn fake_tool(dir: &std::path::Path, reply: &str) -> PathBuf {
        let path = dir.join("fake-cli");
        let script = format!(
            "#!/bin/sh\necho \"$@\" >> calls.log\nif [ \"$1\" = config ]; then echo '{{}}' > {CONFIG_NAME}; exit 0; fi\ncat <<'REPLY'\n{reply}\nREPLY\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn cli(dir: &std::path::Path, reply: &str) -> WalletCli {
        WalletCli::new(WalletCliConfig {
            exec_path: fake_tool(dir, reply),
            work_dir: dir.join("work"),
            network_url: "https://net.example".into(),
            wallet_abi: dir.join("SafeMultisigWallet.abi.json"),
            depool_abi: None,
            elector_abi: None,
            timeout: Duration::from_secs(5),
        })
    }

    fn calls(cli: &WalletCli) -> String {
        std::fs::read_to_string(cli.runner.cwd().join("calls.log")).unwrap()
    }

    #[test]
    fn initialises_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli(dir.path(), "Succeeded.\nacc_type: Active\nbalance: 42\n");
        cli.account(&Address::new("0:aa")).unwrap();
        let acc = cli.account(&Address::new("0:aa")).unwrap();
        assert_eq!(acc.balance, NanoTokens::new(42));
        let log = calls(&cli);
        assert_eq!(log.lines().filter(|l| l.starts_with("config")).count(), 1);
    }

    #[test]
    fn submit_returns_transaction_id() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli(dir.path(), "Succeeded.\nResult: {\"transId\": \"0x6001\"}");
        let transfer = Transfer {
            from: Address::new("0:aa"),
            dest: Address::new("-1:3333"),
            value: NanoTokens::from_tokens(1),
            bounce: true,
            payload: "te6cc".into(),
        };
        let id = cli
            .submit_transaction(&transfer, &Seed::new("alpha beta"))
            .unwrap();
        assert_eq!(id, TransactionId("0x6001".into()));
        let log = calls(&cli);
        assert!(log.contains("submitTransaction"));
        assert!(log.contains("\"value\":\"1000000000\""));
    }

    #[test]
    fn pool_info_requires_abi() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli(dir.path(), "");
        assert!(matches!(
            cli.pool_info(&Address::new("0:pool")),
            Err(ChainError::Execution(_))
        ));
    }

    #[test]
    fn participant_stakes_without_abi_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli(dir.path(), "");
        assert!(cli
            .participant_stakes(&Address::new("-1:3333"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn raw_getter_used_without_elector_abi() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli(dir.path(), "Succeeded.\nResult: [\"1612000000\"]");
        let ids = cli.active_election_ids(&Address::new("-1:3333")).unwrap();
        assert_eq!(ids, vec![ElectionId::new("1612000000")]);
        assert!(calls(&cli).contains("runget -1:3333 active_election_id"));
    }
}
