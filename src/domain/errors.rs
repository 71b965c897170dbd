use thiserror::Error;

/// Errors raised while reshaping an envelope into a log payload
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("failed to dump {section}: {source}")]
    Dump {
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{section} did not dump to a JSON object")]
    NotAnObject { section: &'static str },
}

/// Errors raised while turning a telemetry snapshot into time series
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unsupported value for {name}: {kind}")]
    UnsupportedValue { name: String, kind: &'static str },
}

/// Errors raised by the in-process telemetry registry
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{name} expects {expected} label values, got {actual}")]
    LabelArity {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("series already registered: {name}")]
    Duplicate { name: String },

    #[error("collector registration failed: {0}")]
    Registration(#[from] prometheus::Error),
}

/// Errors returned by the remote backends
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("application not found: {guid}")]
    AppNotFound { guid: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_value_formatting() {
        let error = ReportError::UnsupportedValue {
            name: "stackdriver-nozzle/version".to_string(),
            kind: "text",
        };

        let msg = error.to_string();
        assert!(msg.contains("stackdriver-nozzle/version"));
        assert!(msg.contains("text"));
    }

    #[test]
    fn test_backend_status_formatting() {
        let error = BackendError::Status {
            endpoint: "timeSeries".to_string(),
            status: 429,
            body: "quota".to_string(),
        };
        assert_eq!(error.to_string(), "timeSeries returned 429: quota");
    }
}
