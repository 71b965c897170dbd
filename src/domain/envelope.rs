//! Platform event envelopes as delivered by the firehose.
//!
//! Field names follow the wire JSON of the event protocol: the envelope and most
//! sub-messages are camelCased, `LogMessage` keeps the snake_cased protobuf names.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Coarse event-type tag carried by every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    HttpStartStop,
    LogMessage,
    ValueMetric,
    CounterEvent,
    Error,
    ContainerMetric,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::HttpStartStop => "HttpStartStop",
            EventType::LogMessage => "LogMessage",
            EventType::ValueMetric => "ValueMetric",
            EventType::CounterEvent => "CounterEvent",
            EventType::Error => "Error",
            EventType::ContainerMetric => "ContainerMetric",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "OUT")]
    Out,
    #[serde(rename = "ERR")]
    Err,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Out => f.write_str("OUT"),
            MessageType::Err => f.write_str("ERR"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerType {
    #[default]
    Client,
    Server,
}

impl fmt::Display for PeerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerType::Client => f.write_str("Client"),
            PeerType::Server => f.write_str("Server"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Connect,
    Trace,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
        };
        f.write_str(name)
    }
}

/// 128-bit identifier split into two little-endian halves, as the protocol sends it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawUuid {
    pub low: u64,
    pub high: u64,
}

impl RawUuid {
    pub fn to_uuid(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.low.to_le_bytes());
        bytes[8..].copy_from_slice(&self.high.to_le_bytes());
        Uuid::from_bytes(bytes)
    }
}

/// Canonical hyphenated rendering, empty when the id is absent
pub fn format_uuid(id: Option<&RawUuid>) -> String {
    id.map(|id| id.to_uuid().hyphenated().to_string())
        .unwrap_or_default()
}

fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

fn is_zero_i32(value: &i32) -> bool {
    *value == 0
}

/// Raw message bytes travel as text on the JSON wire.
mod lossy_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(text.into_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    #[serde(with = "lossy_text")]
    pub message: Vec<u8>,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_instance: String,
}

impl LogMessage {
    pub fn new(message: impl Into<Vec<u8>>, message_type: MessageType) -> Self {
        Self {
            message: message.into(),
            message_type,
            timestamp: 0,
            app_id: String::new(),
            source_type: String::new(),
            source_instance: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpStartStop {
    #[serde(default)]
    pub start_timestamp: i64,
    #[serde(default)]
    pub stop_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RawUuid>,
    #[serde(default)]
    pub peer_type: PeerType,
    #[serde(default)]
    pub method: Method,
    #[serde(default)]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub status_code: i32,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub content_length: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<RawUuid>,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub instance_index: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forwarded: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueMetric {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterEvent {
    pub name: String,
    #[serde(default)]
    pub delta: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerMetric {
    pub application_id: String,
    #[serde(default)]
    pub instance_index: i32,
    #[serde(default)]
    pub cpu_percentage: f64,
    #[serde(default)]
    pub memory_bytes: u64,
    #[serde(default)]
    pub disk_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bytes_quota: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_bytes_quota: Option<u64>,
}

/// One event record from the platform's event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub origin: String,
    pub event_type: EventType,
    /// Nanoseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deployment: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_start_stop: Option<HttpStartStop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_message: Option<LogMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_metric: Option<ValueMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_event: Option<CounterEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_metric: Option<ContainerMetric>,
}

impl Envelope {
    /// Bare envelope of the given kind with no sub-message attached
    pub fn new(origin: impl Into<String>, event_type: EventType) -> Self {
        Self {
            origin: origin.into(),
            event_type,
            timestamp: 0,
            deployment: String::new(),
            job: String::new(),
            index: String::new(),
            ip: String::new(),
            tags: HashMap::new(),
            http_start_stop: None,
            log_message: None,
            value_metric: None,
            counter_event: None,
            error: None,
            container_metric: None,
        }
    }

    pub fn with_log_message(origin: impl Into<String>, log_message: LogMessage) -> Self {
        Self {
            log_message: Some(log_message),
            ..Self::new(origin, EventType::LogMessage)
        }
    }

    pub fn with_error(origin: impl Into<String>, error: ErrorEvent) -> Self {
        Self {
            error: Some(error),
            ..Self::new(origin, EventType::Error)
        }
    }

    pub fn with_http_start_stop(origin: impl Into<String>, http: HttpStartStop) -> Self {
        Self {
            http_start_stop: Some(http),
            ..Self::new(origin, EventType::HttpStartStop)
        }
    }

    pub fn timestamped(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Application GUID this envelope belongs to, if any
    pub fn application_id(&self) -> Option<String> {
        let id = match self.event_type {
            EventType::LogMessage => self.log_message.as_ref().map(|m| m.app_id.clone()),
            EventType::HttpStartStop => self
                .http_start_stop
                .as_ref()
                .and_then(|h| h.application_id.as_ref())
                .map(|id| format_uuid(Some(id))),
            EventType::ContainerMetric => self
                .container_metric
                .as_ref()
                .map(|c| c.application_id.clone()),
            _ => None,
        };
        id.filter(|id| !id.is_empty())
    }
}
