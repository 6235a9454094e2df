//! Adapters over the node console and wallet command-line tools.

pub mod console;
pub mod output;
pub mod runner;
pub mod rust_node;
pub mod wallet_cli;

pub use console::{ConsoleConfig, NodeConsole};
pub use runner::ToolRunner;
pub use rust_node::RustNode;
pub use wallet_cli::{WalletCli, WalletCliConfig};
