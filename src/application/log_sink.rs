//! Envelope to log-record translation and delivery.

use crate::domain::envelope::{Envelope, EventType, LogMessage, MessageType, format_uuid};
use crate::domain::errors::{TelemetryError, TranslateError};
use crate::domain::log::{LogRecord, Severity};
use crate::domain::ports::{LabelMaker, LogAdapter};
use crate::domain::telemetry::{Counter, CounterMap};
use crate::infrastructure::observability::TelemetryRegistry;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, error};

/// Dump a serializable value into a generic JSON object
fn struct_to_map<T: Serialize>(
    value: &T,
    section: &'static str,
) -> Result<Map<String, Value>, TranslateError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TranslateError::NotAnObject { section }),
        Err(source) => Err(TranslateError::Dump { section, source }),
    }
}

fn parse_severity(message_type: MessageType) -> Severity {
    match message_type {
        MessageType::Err => Severity::Error,
        MessageType::Out => Severity::Default,
    }
}

/// Converts envelopes into structured log records
pub struct EnvelopeTranslator {
    label_maker: Arc<dyn LabelMaker>,
    newline_token: String,
}

impl EnvelopeTranslator {
    pub fn new(label_maker: Arc<dyn LabelMaker>, newline_token: impl Into<String>) -> Self {
        Self {
            label_maker,
            newline_token: newline_token.into(),
        }
    }

    pub async fn translate(&self, envelope: &Envelope) -> LogRecord {
        let mut payload = struct_to_map(envelope, "envelope").unwrap_or_else(|e| {
            error!(error = %e, origin = %envelope.origin, "error parsing envelope");
            Map::new()
        });

        payload.insert(
            "eventType".to_string(),
            Value::String(envelope.event_type.to_string()),
        );

        let mut severity = Severity::Default;

        // The generic dump is not trusted to keep full nanosecond precision
        if envelope.timestamp != 0 {
            payload.insert("timestamp".to_string(), json!(envelope.timestamp));
        }

        match envelope.event_type {
            EventType::LogMessage => {
                if let Some(log_message) = &envelope.log_message {
                    match self.reshape_log_message(log_message) {
                        Ok((message, log_message_map)) => {
                            severity = parse_severity(log_message.message_type);
                            payload.insert("message".to_string(), Value::String(message));
                            payload.insert("logMessage".to_string(), Value::Object(log_message_map));
                        }
                        Err(e) => error!(error = %e, "error parsing logMessage"),
                    }
                }
            }
            EventType::Error => {
                let message = envelope
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                payload.insert("message".to_string(), Value::String(message));
                severity = Severity::Error;
            }
            EventType::HttpStartStop => {
                if let Some(http) = &envelope.http_start_stop {
                    match struct_to_map(http, "httpStartStop") {
                        Ok(mut http_map) => {
                            http_map.insert("method".to_string(), Value::String(http.method.to_string()));
                            http_map.insert(
                                "peerType".to_string(),
                                Value::String(http.peer_type.to_string()),
                            );
                            http_map.insert(
                                "requestId".to_string(),
                                Value::String(format_uuid(http.request_id.as_ref())),
                            );
                            payload.insert("httpStartStop".to_string(), Value::Object(http_map));
                        }
                        Err(e) => error!(error = %e, "error parsing httpStartStop"),
                    }
                }
            }
            _ => {}
        }

        let labels = self.label_maker.log_labels(envelope).await;
        if let Some(app) = labels.get("applicationPath").filter(|app| !app.is_empty()) {
            payload.insert("serviceContext".to_string(), json!({ "service": app }));
        }

        LogRecord {
            payload,
            labels,
            severity,
        }
    }

    /// Returns the human message and the sub-payload to attach under `logMessage`
    fn reshape_log_message(
        &self,
        log_message: &LogMessage,
    ) -> Result<(String, Map<String, Value>), TranslateError> {
        let mut log_message_map = struct_to_map(log_message, "logMessage")?;
        let mut message = self.parse_message(&log_message.message);

        // Applications often log JSON; lift its fields next to the protocol ones
        if let Ok(Value::Object(mut embedded)) = serde_json::from_slice::<Value>(&log_message.message) {
            if matches!(embedded.get("msg"), Some(Value::String(_))) {
                if let Some(Value::String(msg)) = embedded.remove("msg") {
                    message = msg;
                }
            }
            log_message_map.extend(embedded);
        }

        // snake_cased to match the protocol field, unlike the camelCased envelope keys
        log_message_map.insert(
            "message_type".to_string(),
            Value::String(log_message.message_type.to_string()),
        );
        log_message_map.remove("message");

        Ok((message, log_message_map))
    }

    fn parse_message(&self, raw_message: &[u8]) -> String {
        let message = String::from_utf8_lossy(raw_message);
        if self.newline_token.is_empty() {
            return message.into_owned();
        }
        message.replace(&self.newline_token, "\n")
    }
}

/// Counters maintained by the log sink
#[derive(Clone)]
pub struct LogSinkMetrics {
    pub events: Arc<CounterMap>,
    pub post_errors: Counter,
}

impl LogSinkMetrics {
    pub fn register(registry: &TelemetryRegistry) -> Result<Self, TelemetryError> {
        Ok(Self {
            events: registry.register_counter_map(
                "log_sink.events",
                "Envelopes received by the log sink",
                &["event_type"],
            )?,
            post_errors: registry
                .register_counter("log_sink.post_errors", "Log records the backend rejected")?,
        })
    }
}

/// Receives envelopes, translates them and hands the records to the log adapter
pub struct LogSink {
    translator: EnvelopeTranslator,
    log_adapter: Arc<dyn LogAdapter>,
    metrics: LogSinkMetrics,
}

impl LogSink {
    pub fn new(
        translator: EnvelopeTranslator,
        log_adapter: Arc<dyn LogAdapter>,
        metrics: LogSinkMetrics,
    ) -> Self {
        Self {
            translator,
            log_adapter,
            metrics,
        }
    }

    pub async fn receive(&self, envelope: Option<Envelope>) {
        // The stream yields empty envelopes in bursts after a fatal upstream
        // error; the stream client reports those itself.
        let Some(envelope) = envelope else {
            return;
        };

        if let Err(e) = self
            .metrics
            .events
            .add(&[&envelope.event_type.to_string()], 1)
        {
            debug!(error = %e, "event counter not updated");
        }

        let log = self.translator.translate(&envelope).await;
        if let Err(e) = self.log_adapter.post_log(log).await {
            self.metrics.post_errors.increment();
            error!(error = ?e, event_type = %envelope.event_type, "logSink.PostLog failed");
        }
    }
}
