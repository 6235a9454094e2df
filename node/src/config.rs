//! Daemon configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use stakeward_policy::{PrudentGate, StakeExpression};
use stakeward_types::{Address, NanoTokens};
use stakeward_utils::LogFormat;

use crate::NodeError;

/// Configuration for a stakeward daemon.
///
/// Can be loaded from a TOML file via [`DaemonConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Call [`DaemonConfig::validate`]
/// once all layers are merged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Name attached to every telemetry record.
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Directory for the election registry and tool state.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Largest acceptable node sync lag, in seconds.
    #[serde(default = "default_max_sync_diff")]
    pub max_sync_diff: i64,

    /// Sleep after an out-of-sync or failed cycle.
    #[serde(default = "default_short_interval")]
    pub short_interval_secs: u64,

    /// Sleep after a healthy cycle.
    #[serde(default = "default_long_interval")]
    pub long_interval_secs: u64,

    /// Write Prometheus metrics to this file after every cycle.
    #[serde(default)]
    pub metrics_file: Option<PathBuf>,

    /// Registry location; `<work_dir>/elections.json` when unset.
    #[serde(default)]
    pub registry_file: Option<PathBuf>,

    #[serde(default)]
    pub telemetry: TelemetrySettings,

    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub secrets: SecretSettings,

    #[serde(default)]
    pub elections: ElectionSettings,
}

/// Logstash shipping. Disabled unless `host` is set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_logstash_port")]
    pub port: u16,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// External tools the chain adapters drive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_console_path")]
    pub console_path: PathBuf,

    #[serde(default = "default_wallet_cli_path")]
    pub wallet_cli_path: PathBuf,

    /// Working directory for tool config and query files; `<work_dir>/tools`
    /// when unset.
    #[serde(default)]
    pub tools_dir: Option<PathBuf>,

    /// Validator console endpoint.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    #[serde(default = "default_server_pub_key")]
    pub server_pub_key_path: PathBuf,

    #[serde(default = "default_client_key")]
    pub client_key_path: PathBuf,

    #[serde(default = "default_network_url")]
    pub network_url: String,

    #[serde(default = "default_wallet_abi")]
    pub wallet_abi: PathBuf,

    #[serde(default)]
    pub depool_abi: Option<PathBuf>,

    #[serde(default)]
    pub elector_abi: Option<PathBuf>,

    /// Per-command timeout.
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecretSettings {
    /// Environment variable holding the JSON connection string.
    #[serde(default = "default_secrets_env")]
    pub env_var: String,
}

/// Which election strategy the loop runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionModeSetting {
    /// Only check sync and report status.
    Off,
    /// Stake directly from the validator wallet.
    #[default]
    Validator,
    /// Stake through the configured pools.
    Depool,
}

impl std::str::FromStr for ElectionModeSetting {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "validator" => Ok(Self::Validator),
            "depool" => Ok(Self::Depool),
            other => Err(NodeError::Config(format!(
                "unknown election mode {other:?}: expected off, validator or depool"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionSettings {
    #[serde(default)]
    pub mode: ElectionModeSetting,

    /// Stake per election, e.g. `"30%"` of the available funds or `"10000"` tokens.
    #[serde(default = "default_stake")]
    pub default_stake: StakeExpression,

    #[serde(default = "default_max_factor")]
    pub stake_max_factor: f64,

    /// Tokens that must stay in the validator wallet after a bid.
    #[serde(default, with = "tokens")]
    pub min_balance: NanoTokens,

    #[serde(default)]
    pub prudent: Option<PrudentGate>,

    #[serde(default)]
    pub pools: Vec<PoolSettings>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolSettings {
    pub depool_address: Address,

    /// Resolved through the pool's info getter when empty.
    #[serde(default)]
    pub proxy_addresses: Vec<Address>,

    /// Longest gap between ticktocks while elections are open, in seconds.
    #[serde(default = "default_ticktock_period")]
    pub max_ticktock_period: u64,

    #[serde(default)]
    pub prudent: Option<PrudentGate>,

    #[serde(default)]
    pub replenish: Option<ReplenishSettings>,

    #[serde(default = "default_true")]
    pub enable_elections: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplenishSettings {
    /// Tokens sent per top-up.
    #[serde(with = "tokens")]
    pub topup: NanoTokens,

    /// Minimum gap between top-ups, in seconds.
    #[serde(default = "default_replenish_period")]
    pub max_period: u64,
}

/// Token amounts are written as decimal strings (`"12.5"`) or integers.
mod tokens {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use stakeward_types::NanoTokens;

    pub fn serialize<S: Serializer>(amount: &NanoTokens, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NanoTokens, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Text(String),
        }
        match Raw::deserialize(d)? {
            Raw::Int(tokens) => Ok(NanoTokens::from_tokens(tokens as u128)),
            Raw::Text(s) => NanoTokens::parse_tokens(&s).map_err(de::Error::custom),
        }
    }
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_node_name() -> String {
    "stakeward-0".to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("/var/lib/stakeward")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_sync_diff() -> i64 {
    30
}

fn default_short_interval() -> u64 {
    120
}

fn default_long_interval() -> u64 {
    900
}

fn default_logstash_port() -> u16 {
    5959
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_console_path() -> PathBuf {
    PathBuf::from("console")
}

fn default_wallet_cli_path() -> PathBuf {
    PathBuf::from("tonos-cli")
}

fn default_server_addr() -> String {
    "127.0.0.1:3031".to_string()
}

fn default_server_pub_key() -> PathBuf {
    PathBuf::from("certs/server_pub.json")
}

fn default_client_key() -> PathBuf {
    PathBuf::from("certs/client.json")
}

fn default_network_url() -> String {
    "https://main.ton.dev".to_string()
}

fn default_wallet_abi() -> PathBuf {
    PathBuf::from("configs/SafeMultisigWallet.abi.json")
}

fn default_tool_timeout() -> u64 {
    60
}

fn default_secrets_env() -> String {
    "STAKEWARD_SECRETS".to_string()
}

fn default_stake() -> StakeExpression {
    StakeExpression::percent(30)
}

fn default_max_factor() -> f64 {
    3.0
}

fn default_ticktock_period() -> u64 {
    3600
}

fn default_replenish_period() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("DaemonConfig is always serializable to TOML")
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.short_interval_secs == 0 || self.long_interval_secs == 0 {
            return Err(NodeError::Config("sleep intervals must be positive".into()));
        }
        if self.max_sync_diff < 0 {
            return Err(NodeError::Config("max_sync_diff must not be negative".into()));
        }
        if self.tools.timeout_secs == 0 {
            return Err(NodeError::Config("tools.timeout_secs must be positive".into()));
        }
        if self.secrets.env_var.trim().is_empty() {
            return Err(NodeError::Config("secrets.env_var is empty".into()));
        }
        self.elections.validate()
    }

    pub fn registry_path(&self) -> PathBuf {
        self.registry_file
            .clone()
            .unwrap_or_else(|| self.work_dir.join("elections.json"))
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.tools
            .tools_dir
            .clone()
            .unwrap_or_else(|| self.work_dir.join("tools"))
    }

    pub fn short_interval(&self) -> Duration {
        Duration::from_secs(self.short_interval_secs)
    }

    pub fn long_interval(&self) -> Duration {
        Duration::from_secs(self.long_interval_secs)
    }
}

impl ElectionSettings {
    pub fn validate(&self) -> Result<(), NodeError> {
        if !self.stake_max_factor.is_finite() || !(1.0..=100.0).contains(&self.stake_max_factor) {
            return Err(NodeError::Config(format!(
                "stake_max_factor must be between 1 and 100, got {}",
                self.stake_max_factor
            )));
        }
        if let Some(gate) = &self.prudent {
            gate.validate()?;
        }
        if self.mode == ElectionModeSetting::Depool && self.pools.is_empty() {
            return Err(NodeError::Config(
                "depool mode needs at least one [[elections.pools]] entry".into(),
            ));
        }
        for pool in &self.pools {
            if pool.depool_address.as_str().is_empty() {
                return Err(NodeError::Config("pool with empty depool_address".into()));
            }
            if let Some(gate) = &pool.prudent {
                gate.validate()?;
            }
            if pool.max_ticktock_period == 0 {
                return Err(NodeError::Config(format!(
                    "pool {}: max_ticktock_period must be positive",
                    pool.depool_address
                )));
            }
        }
        Ok(())
    }
}

impl PoolSettings {
    /// A pool with default timing, no top-ups, and proxies resolved on first use.
    pub fn new(depool_address: impl Into<Address>) -> Self {
        Self {
            depool_address: depool_address.into(),
            proxy_addresses: Vec::new(),
            max_ticktock_period: default_ticktock_period(),
            prudent: None,
            replenish: None,
            enable_elections: true,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            work_dir: default_work_dir(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            max_sync_diff: default_max_sync_diff(),
            short_interval_secs: default_short_interval(),
            long_interval_secs: default_long_interval(),
            metrics_file: None,
            registry_file: None,
            telemetry: TelemetrySettings::default(),
            tools: ToolSettings::default(),
            secrets: SecretSettings::default(),
            elections: ElectionSettings::default(),
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            host: None,
            port: default_logstash_port(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            console_path: default_console_path(),
            wallet_cli_path: default_wallet_cli_path(),
            tools_dir: None,
            server_addr: default_server_addr(),
            server_pub_key_path: default_server_pub_key(),
            client_key_path: default_client_key(),
            network_url: default_network_url(),
            wallet_abi: default_wallet_abi(),
            depool_abi: None,
            elector_abi: None,
            timeout_secs: default_tool_timeout(),
        }
    }
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            env_var: default_secrets_env(),
        }
    }
}

impl Default for ElectionSettings {
    fn default() -> Self {
        Self {
            mode: ElectionModeSetting::default(),
            default_stake: default_stake(),
            stake_max_factor: default_max_factor(),
            min_balance: NanoTokens::ZERO,
            prudent: None,
            pools: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = DaemonConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = DaemonConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.long_interval_secs, config.long_interval_secs);
        assert_eq!(parsed.elections.default_stake, config.elections.default_stake);
        assert_eq!(parsed.elections.min_balance, config.elections.min_balance);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = DaemonConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.max_sync_diff, 30);
        assert_eq!(config.short_interval_secs, 120);
        assert_eq!(config.long_interval_secs, 900);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.elections.mode, ElectionModeSetting::Validator);
        assert_eq!(config.elections.default_stake, StakeExpression::percent(30));
        assert_eq!(config.telemetry.port, 5959);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            long_interval_secs = 1800
            log_format = "json"

            [elections]
            default_stake = "12.5%"
            min_balance = "20.5"
        "#;
        let config = DaemonConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.long_interval_secs, 1800);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.short_interval_secs, 120); // default
        assert_eq!(config.elections.default_stake.to_string(), "12.5%");
        assert_eq!(config.elections.min_balance, NanoTokens::new(20_500_000_000));
    }

    #[test]
    fn pools_parse_with_defaults() {
        let toml = r#"
            [elections]
            mode = "depool"

            [[elections.pools]]
            depool_address = "0:aaaa"

            [[elections.pools]]
            depool_address = "0:bbbb"
            proxy_addresses = ["-1:cccc"]
            enable_elections = false
            replenish = { topup = 5, max_period = 600 }
        "#;
        let config = DaemonConfig::from_toml_str(toml).expect("should parse");
        config.validate().expect("valid");
        let pools = &config.elections.pools;
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].max_ticktock_period, 3600);
        assert!(pools[0].enable_elections);
        assert!(pools[0].replenish.is_none());
        assert_eq!(pools[1].proxy_addresses, vec![Address::new("-1:cccc")]);
        assert!(!pools[1].enable_elections);
        let replenish = pools[1].replenish.as_ref().unwrap();
        assert_eq!(replenish.topup, NanoTokens::from_tokens(5));
        assert_eq!(replenish.max_period, 600);
    }

    #[test]
    fn malformed_stake_expression_is_a_config_error() {
        let err = DaemonConfig::from_toml_str("[elections]\ndefault_stake = \"thirty\"").unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn depool_mode_without_pools_is_rejected() {
        let config = DaemonConfig::from_toml_str("[elections]\nmode = \"depool\"").unwrap();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn max_factor_below_one_is_rejected() {
        let mut config = DaemonConfig::default();
        config.elections.stake_max_factor = 0.5;
        assert!(config.validate().is_err());
        config.elections.stake_max_factor = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn prudent_threshold_is_checked() {
        let toml = r#"
            [elections.prudent]
            election_end_join_offset = 600
            join_threshold = 120
        "#;
        let config = DaemonConfig::from_toml_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(NodeError::Policy(_))));
    }

    #[test]
    fn registry_path_defaults_under_work_dir() {
        let mut config = DaemonConfig::default();
        config.work_dir = PathBuf::from("/tmp/sw");
        assert_eq!(config.registry_path(), PathBuf::from("/tmp/sw/elections.json"));
        assert_eq!(config.tools_dir(), PathBuf::from("/tmp/sw/tools"));
        config.registry_file = Some(PathBuf::from("/data/reg.json"));
        assert_eq!(config.registry_path(), PathBuf::from("/data/reg.json"));
    }

    #[test]
    fn election_mode_parses_case_insensitively() {
        assert_eq!("Off".parse::<ElectionModeSetting>().unwrap(), ElectionModeSetting::Off);
        assert_eq!(" depool ".parse::<ElectionModeSetting>().unwrap(), ElectionModeSetting::Depool);
        assert!("pool".parse::<ElectionModeSetting>().is_err());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = DaemonConfig::from_toml_file("/nonexistent/stakeward.toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }
}
