use stakeward_telemetry::{Category, TelemetryRecord, TelemetrySink};
use std::sync::Mutex;

/// Keeps every record it is sent.
#[derive(Default)]
pub struct RecordingTelemetry {
    records: Mutex<Vec<(Category, TelemetryRecord)>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Category, TelemetryRecord)> {
        self.records.lock().unwrap().clone()
    }

    /// Records sent under `category`, oldest first.
    pub fn of(&self, category: Category) -> Vec<TelemetryRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn send(&self, category: Category, record: TelemetryRecord) {
        self.records.lock().unwrap().push((category, record));
    }
}
