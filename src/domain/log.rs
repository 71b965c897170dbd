use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Default,
    Error,
}

/// Structured log entry produced from one envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogRecord {
    pub payload: Map<String, Value>,
    pub labels: HashMap<String, String>,
    pub severity: Severity,
}

impl LogRecord {
    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(Value::as_str)
    }
}
