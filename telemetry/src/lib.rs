//! Telemetry records and sinks.
//!
//! The orchestration loop reports what it does through a [`TelemetrySink`].
//! Sending never blocks and never fails from the caller's point of view.

pub mod logstash;
pub mod record;

pub use logstash::{LogstashClient, LogstashConfig, LogstashWorker};
pub use record::{Category, TelemetryRecord};

pub trait TelemetrySink: Send + Sync {
    /// Queue `record` under `category`. Fire-and-forget.
    fn send(&self, category: Category, record: TelemetryRecord);
}

/// Discards records. Used when no collector is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn send(&self, category: Category, _record: TelemetryRecord) {
        tracing::trace!(category = %category, "telemetry disabled, record dropped");
    }
}
