//! Logstash TCP shipping.
//!
//! [`LogstashClient`] is the sink handed to producers; it pushes documents
//! into a bounded queue and drops them when the queue is full.
//! [`LogstashWorker`] drains the queue on its own task, batching whatever
//! is waiting and writing it as newline-delimited JSON over one connection.

use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};

use crate::{Category, TelemetryRecord, TelemetrySink};

#[derive(Clone, Debug)]
pub struct LogstashConfig {
    pub host: String,
    pub port: u16,
    pub queue_capacity: usize,
    /// Added to every document, e.g. `node_name`.
    pub static_fields: Map<String, Value>,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl LogstashConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            queue_capacity: 1024,
            static_fields: Map::new(),
            connect_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(5),
        }
    }
}

pub struct LogstashClient {
    tx: mpsc::Sender<Value>,
    static_fields: Map<String, Value>,
    dropped: Arc<AtomicU64>,
}

impl LogstashClient {
    /// Create the client and the worker that must be spawned to drain it.
    pub fn new(config: LogstashConfig) -> (Self, LogstashWorker) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let client = Self {
            tx,
            static_fields: config.static_fields.clone(),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        let worker = LogstashWorker { config, rx };
        (client, worker)
    }

    /// Records discarded because the queue was full or the worker had stopped.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TelemetrySink for LogstashClient {
    fn send(&self, category: Category, record: TelemetryRecord) {
        let doc = record.into_document(category, Utc::now(), &self.static_fields);
        if let Err(e) = self.tx.try_send(doc) {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(category = %category, dropped, error = %e, "telemetry record dropped");
        }
    }
}

pub struct LogstashWorker {
    config: LogstashConfig,
    rx: mpsc::Receiver<Value>,
}

impl LogstashWorker {
    /// Ship batches until shutdown, then make one last attempt to flush.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            "telemetry shipping started"
        );
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                next = self.rx.recv() => {
                    let Some(first) = next else { break };
                    let batch = self.batch(first);
                    self.ship(&batch).await;
                }
            }
        }
        self.rx.close();
        let mut rest = Vec::new();
        while let Ok(doc) = self.rx.try_recv() {
            rest.push(doc);
        }
        if !rest.is_empty() {
            self.ship(&rest).await;
        }
        tracing::info!("telemetry shipping stopped");
    }

    fn batch(&mut self, first: Value) -> Vec<Value> {
        let mut batch = vec![first];
        while let Ok(doc) = self.rx.try_recv() {
            batch.push(doc);
        }
        batch
    }

    async fn ship(&self, batch: &[Value]) {
        match self.write_batch(batch).await {
            Ok(()) => tracing::debug!(records = batch.len(), "telemetry batch shipped"),
            Err(e) => tracing::warn!(
                records = batch.len(),
                error = %e,
                "failed to ship telemetry batch"
            ),
        }
    }

    async fn write_batch(&self, batch: &[Value]) -> std::io::Result<()> {
        let addr = (self.config.host.as_str(), self.config.port);
        let mut stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"))??;
        let mut payload = Vec::new();
        for doc in batch {
            serde_json::to_writer(&mut payload, doc)?;
            payload.push(b'\n');
        }
        tokio::time::timeout(self.config.write_timeout, async {
            stream.write_all(&payload).await?;
            stream.shutdown().await
        })
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "write timed out"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn config(port: u16, capacity: usize) -> LogstashConfig {
        let mut c = LogstashConfig::new("127.0.0.1", port);
        c.queue_capacity = capacity;
        c.static_fields
            .insert("node_name".into(), Value::String("node-a".into()));
        c
    }

    #[tokio::test]
    async fn ships_newline_delimited_documents() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (client, worker) = LogstashClient::new(config(port, 16));
        client.send(Category::NodeStatus, TelemetryRecord::new().with("timediff", 3));
        client.send(Category::ElectionStatus, TelemetryRecord::new().with("stake", "0"));

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(worker.run(rx));

        let mut received = String::new();
        while received.lines().count() < 2 {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = String::new();
            sock.read_to_string(&mut buf).await.unwrap();
            received.push_str(&buf);
        }
        let docs: Vec<Value> = received
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(docs[0]["data_type"], "node_status");
        assert_eq!(docs[0]["timediff"], 3);
        assert_eq!(docs[0]["node_name"], "node-a");
        assert_eq!(docs[1]["data_type"], "election_status");

        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (client, _worker) = LogstashClient::new(config(1, 1));
        for _ in 0..3 {
            client.send(Category::NodeStatus, TelemetryRecord::new());
        }
        assert_eq!(client.dropped(), 2);
    }

    #[tokio::test]
    async fn unreachable_collector_is_not_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let (client, worker) = LogstashClient::new(config(port, 4));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(worker.run(rx));
        client.send(Category::NodeStatus, TelemetryRecord::new());
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
