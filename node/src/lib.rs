//! stakeward node: the election orchestration loop and everything it needs
//! to run as a daemon.
//!
//! Each cycle the loop:
//! - checks the validator node is in sync
//! - reconciles the election registry with the elector's open elections
//! - recovers stakes of finished elections
//! - bids on new elections, directly or on behalf of staking pools
//! - persists the registry and reports the cycle through telemetry

mod cycle;
mod direct;
mod pool;
mod reconcile;
mod recovery;

pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod report;
pub mod service;
pub mod shutdown;
pub mod strategy;

pub use config::{
    DaemonConfig, ElectionModeSetting, ElectionSettings, PoolSettings, ReplenishSettings,
    SecretSettings, TelemetrySettings, ToolSettings,
};
pub use cycle::Collaborators;
pub use direct::DirectStrategy;
pub use error::NodeError;
pub use metrics::DaemonMetrics;
pub use orchestrator::{CycleOutcome, LoopSettings, Orchestrator};
pub use pool::{PoolStrategy, POOL_BID_FEE};
pub use recovery::RECOVER_FEE;
pub use report::CycleReport;
pub use service::StakewardService;
pub use shutdown::ShutdownController;
pub use strategy::Strategy;
