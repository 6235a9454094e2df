//! The daemon service: builds every collaborator from [`DaemonConfig`] and
//! runs the orchestration loop and the telemetry worker as tokio tasks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use stakeward_chain::tool::{ConsoleConfig, NodeConsole, RustNode, WalletCli, WalletCliConfig};
use stakeward_chain::EnvSecretProvider;
use stakeward_registry::JsonFileStore;
use stakeward_telemetry::{LogstashClient, LogstashConfig, LogstashWorker, NoopTelemetry, TelemetrySink};
use stakeward_types::SystemClock;

use crate::config::DaemonConfig;
use crate::cycle::Collaborators;
use crate::metrics::DaemonMetrics;
use crate::orchestrator::{LoopSettings, Orchestrator};
use crate::shutdown::ShutdownController;
use crate::strategy::Strategy;
use crate::NodeError;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
/// How often the dropped-telemetry gauge is refreshed.
const TELEMETRY_GAUGE_INTERVAL: Duration = Duration::from_secs(60);

pub struct StakewardService {
    orchestrator: Option<Orchestrator>,
    telemetry: Option<(Arc<LogstashClient>, LogstashWorker)>,
    metrics: Arc<DaemonMetrics>,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
}

impl StakewardService {
    /// Validate `config` and build the service. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(config: DaemonConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let strategy = Strategy::from_settings(&config.elections)?;
        let secrets = EnvSecretProvider::from_env(&config.secrets.env_var)?;
        let metrics = Arc::new(DaemonMetrics::new()?);

        let (sink, telemetry) = match &config.telemetry.host {
            Some(host) => {
                let mut logstash = LogstashConfig::new(host.clone(), config.telemetry.port);
                logstash.queue_capacity = config.telemetry.queue_capacity;
                logstash.static_fields = static_fields(&config);
                let (client, worker) = LogstashClient::new(logstash);
                let client = Arc::new(client);
                tracing::info!(host = %host, port = config.telemetry.port, "telemetry enabled");
                let sink: Arc<dyn TelemetrySink> = client.clone();
                (sink, Some((client, worker)))
            }
            None => {
                tracing::info!("telemetry disabled");
                let sink: Arc<dyn TelemetrySink> = Arc::new(NoopTelemetry);
                (sink, None)
            }
        };

        let tools_dir = config.tools_dir();
        let timeout = Duration::from_secs(config.tools.timeout_secs);
        let cli_config = WalletCliConfig {
            exec_path: config.tools.wallet_cli_path.clone(),
            work_dir: tools_dir.join("wallet-cli"),
            network_url: config.tools.network_url.clone(),
            wallet_abi: config.tools.wallet_abi.clone(),
            depool_abi: config.tools.depool_abi.clone(),
            elector_abi: config.tools.elector_abi.clone(),
            timeout,
        };
        let console = NodeConsole::new(ConsoleConfig {
            exec_path: config.tools.console_path.clone(),
            work_dir: tools_dir.join("console"),
            server_addr: config.tools.server_addr.clone(),
            server_pub_key_path: config.tools.server_pub_key_path.clone(),
            client_private_key_path: config.tools.client_key_path.clone(),
            timeout,
        });

        let deps = Collaborators {
            node: Arc::new(RustNode::new(console, WalletCli::new(cli_config.clone()))),
            wallet: Arc::new(WalletCli::new(cli_config)),
            secrets: Arc::new(secrets),
            telemetry: sink,
            store: Arc::new(JsonFileStore::new(config.registry_path())),
            clock: Arc::new(SystemClock),
        };
        let orchestrator =
            Orchestrator::new(LoopSettings::from(&config), strategy, deps)?.with_metrics(metrics.clone());

        Ok(Self {
            orchestrator: Some(orchestrator),
            telemetry,
            metrics,
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        })
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    pub fn metrics(&self) -> &Arc<DaemonMetrics> {
        &self.metrics
    }

    /// Spawn the telemetry worker and the orchestration loop.
    pub fn start(&mut self) -> Result<(), NodeError> {
        let orchestrator = self
            .orchestrator
            .take()
            .ok_or_else(|| NodeError::Config("service already started".into()))?;

        if let Some((client, worker)) = self.telemetry.take() {
            self.task_handles
                .push(tokio::spawn(worker.run(self.shutdown.subscribe())));

            let metrics = self.metrics.clone();
            let mut shutdown = self.shutdown.subscribe();
            self.task_handles.push(tokio::spawn(async move {
                let mut tick = tokio::time::interval(TELEMETRY_GAUGE_INTERVAL);
                loop {
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = tick.tick() => {
                            metrics.telemetry_dropped.set(client.dropped() as i64);
                        }
                    }
                }
            }));
        }

        self.task_handles
            .push(tokio::spawn(orchestrator.run(self.shutdown.subscribe())));
        tracing::info!("stakeward started");
        Ok(())
    }

    /// Signal every task and wait for them, giving up after a timeout.
    pub async fn stop(&mut self) {
        tracing::info!("stakeward stopping");
        self.shutdown.shutdown();
        for handle in self.task_handles.drain(..) {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "background task failed"),
                Err(_) => tracing::warn!("background task did not stop in time"),
            }
        }
        tracing::info!("stakeward stopped");
    }
}

fn static_fields(config: &DaemonConfig) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("node_name".into(), Value::String(config.node_name.clone()));
    fields
}
