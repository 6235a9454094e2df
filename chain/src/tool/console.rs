//! Validator node console adapter.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use blake2::{Blake2s256, Digest};
use serde_json::json;
use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use stakeward_types::Address;

use super::output;
use super::runner::ToolRunner;
use crate::{ChainError, SyncLag};

/// Key type id the console expects for ed25519 keys.
const KEY_TYPE_ED25519: u32 = 1_209_251_014;
const PLACEHOLDER_WALLET: &str =
    "0:0000000000000000000000000000000000000000000000000000000000000000";
const DEFAULT_MAX_FACTOR: f64 = 2.7;
const BID_QUERY_FILE: &str = "validator-query.boc";
const RECOVER_QUERY_FILE: &str = "recover-query.boc";

#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub exec_path: PathBuf,
    pub work_dir: PathBuf,
    /// `host:port` of the node control server.
    pub server_addr: String,
    pub server_pub_key_path: PathBuf,
    pub client_private_key_path: PathBuf,
    pub timeout: Duration,
}

/// Drives the node console binary.
///
/// Each distinct (wallet, keys, server, max factor) combination gets its own
/// console config file in the working directory.
pub struct NodeConsole {
    runner: ToolRunner,
    server_addr: String,
    server_pub_key_path: PathBuf,
    client_private_key_path: PathBuf,
    key_cache: Mutex<HashMap<PathBuf, (String, SystemTime)>>,
}

impl NodeConsole {
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            runner: ToolRunner::new(config.exec_path, config.work_dir, config.timeout),
            server_addr: config.server_addr,
            server_pub_key_path: config.server_pub_key_path,
            client_private_key_path: config.client_private_key_path,
            key_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Reads a key file, re-reading only when it changed on disk.
    fn read_key(&self, path: &Path) -> Result<String, ChainError> {
        let io_err = |e: std::io::Error| {
            ChainError::Execution(format!("cannot read key {}: {e}", path.display()))
        };
        let mtime = std::fs::metadata(path).and_then(|m| m.modified()).map_err(io_err)?;
        let mut cache = self
            .key_cache
            .lock()
            .map_err(|_| ChainError::Execution("key cache poisoned".into()))?;
        if let Some((key, cached)) = cache.get(path) {
            if *cached == mtime {
                return Ok(key.clone());
            }
        }
        tracing::info!(path = %path.display(), "reading console key");
        let key = std::fs::read_to_string(path).map_err(io_err)?.trim().to_string();
        cache.insert(path.to_path_buf(), (key.clone(), mtime));
        Ok(key)
    }

    /// The console only accepts a literal IP address.
    fn resolved_server_addr(&self) -> Result<String, ChainError> {
        let addr = self
            .server_addr
            .to_socket_addrs()
            .map_err(|e| ChainError::Connectivity(format!("cannot resolve {}: {e}", self.server_addr)))?
            .next()
            .ok_or_else(|| ChainError::Connectivity(format!("no address for {}", self.server_addr)))?;
        Ok(addr.to_string())
    }

    fn config_file(&self, wallet: Option<&Address>, max_factor: f64) -> Result<PathBuf, ChainError> {
        let server_key = self.read_key(&self.server_pub_key_path)?;
        let client_key = self.read_key(&self.client_private_key_path)?;
        let wallet_id = wallet.map(|w| w.as_str().to_string());
        let identity = format!(
            "{}.{server_key}.{client_key}.{}.{max_factor}",
            wallet_id.as_deref().unwrap_or("-"),
            self.server_addr
        );
        let name = hex::encode(Blake2s256::digest(identity.as_bytes()));
        let path = self.runner.cwd().join(format!("conf_{}", &name[..32]));
        let populated = std::fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        if populated {
            return Ok(path);
        }
        std::fs::create_dir_all(self.runner.cwd()).map_err(|e| {
            ChainError::Execution(format!("cannot create {}: {e}", self.runner.cwd().display()))
        })?;
        let doc = json!({
            "config": {
                "server_address": self.resolved_server_addr()?,
                "server_key": { "type_id": KEY_TYPE_ED25519, "pub_key": server_key },
                "client_key": { "type_id": KEY_TYPE_ED25519, "pvt_key": client_key },
            },
            "wallet_id": wallet_id,
            "max_factor": max_factor,
        });
        let body = serde_json::to_string_pretty(&doc)?;
        std::fs::write(&path, body).map_err(|e| {
            ChainError::Execution(format!("cannot write {}: {e}", path.display()))
        })?;
        Ok(path)
    }

    fn command(
        &self,
        command: &str,
        wallet: Option<&Address>,
        max_factor: f64,
    ) -> Result<String, ChainError> {
        let config = self.config_file(wallet, max_factor)?;
        let client_key = self.read_key(&self.client_private_key_path)?;
        let args = vec![
            "-C".to_string(),
            config.to_string_lossy().into_owned(),
            "-c".to_string(),
            command.to_string(),
        ];
        self.runner.run_redacted(&args, &[client_key.as_str()])
    }

    fn read_boc(&self, name: &str) -> Result<String, ChainError> {
        let path = self.runner.cwd().join(name);
        let bytes = std::fs::read(&path).map_err(|e| {
            ChainError::Execution(format!("console produced no {}: {e}", path.display()))
        })?;
        Ok(BASE64.encode(bytes))
    }

    pub fn sync_lag(&self) -> Result<SyncLag, ChainError> {
        let placeholder = Address::new(PLACEHOLDER_WALLET);
        let out = self.command("getstats", Some(&placeholder), DEFAULT_MAX_FACTOR)?;
        output::sync_lag(&out)
    }

    /// Signed bid message for `beneficiary`, base64-encoded.
    pub fn election_bid(
        &self,
        beneficiary: &Address,
        start: u64,
        stop: u64,
        max_factor: f64,
    ) -> Result<String, ChainError> {
        let _ = std::fs::remove_file(self.runner.cwd().join(BID_QUERY_FILE));
        self.command(
            &format!("election-bid {start} {stop}"),
            Some(beneficiary),
            max_factor,
        )?;
        self.read_boc(BID_QUERY_FILE)
    }

    /// Stake recovery message, base64-encoded.
    pub fn recover_stake(&self) -> Result<String, ChainError> {
        let _ = std::fs::remove_file(self.runner.cwd().join(RECOVER_QUERY_FILE));
        self.command("recover_stake", None, DEFAULT_MAX_FACTOR)?;
        self.read_boc(RECOVER_QUERY_FILE)
    }
}
