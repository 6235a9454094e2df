use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of telemetry record, sent as `data_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    NodeStatus,
    ActiveElections,
    FinishedElections,
    ElectionJoin,
    StakeRecover,
    DepoolReplenish,
    DepoolTicktock,
    ElectionStatus,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::NodeStatus => "node_status",
            Category::ActiveElections => "active_elections",
            Category::FinishedElections => "finished_elections",
            Category::ElectionJoin => "election_join",
            Category::StakeRecover => "stake_recover",
            Category::DepoolReplenish => "depool_replenish",
            Category::DepoolTicktock => "depool_ticktock",
            Category::ElectionStatus => "election_status",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flat JSON object of telemetry fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetryRecord {
    fields: Map<String, Value>,
}

impl TelemetryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. Values that fail to serialise are recorded as their
    /// error message.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        self.fields.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The document as shipped: the record's fields plus `data_type`,
    /// `timestamp`, and any static fields not already present.
    pub fn into_document(
        self,
        category: Category,
        at: DateTime<Utc>,
        static_fields: &Map<String, Value>,
    ) -> Value {
        let mut doc = self.fields;
        for (k, v) in static_fields {
            doc.entry(k.clone()).or_insert_with(|| v.clone());
        }
        doc.insert("data_type".into(), Value::String(category.as_str().into()));
        doc.insert(
            "timestamp".into(),
            Value::String(at.format(TIMESTAMP_FORMAT).to_string()),
        );
        Value::Object(doc)
    }
}
