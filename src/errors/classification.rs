use std::time::Duration;
use super::types::LabscanError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
    /// Wait the remote service asked for before the next request.
    pub retry_hint: Option<Duration>,
}

impl ErrorClassification {
    fn retryable(error_type: &'static str) -> Self {
        Self { error_type, retryable: true, retry_hint: None }
    }

    fn fatal(error_type: &'static str) -> Self {
        Self { error_type, retryable: false, retry_hint: None }
    }
}

impl LabscanError {
    /// Classify this error to determine its type and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Transient: safe to retry from the poll loop
            LabscanError::Transport(_) => ErrorClassification::retryable("TransportError"),
            LabscanError::Throttled { retry_after, .. } => ErrorClassification {
                error_type: "ThrottledError",
                retryable: true,
                retry_hint: *retry_after,
            },

            // Fatal: surfaced immediately
            LabscanError::RemoteProtocol(_) => ErrorClassification::fatal("RemoteProtocolError"),
            LabscanError::Rejected(_) => ErrorClassification::fatal("RejectedError"),
            LabscanError::QuotaExceeded(_) => ErrorClassification::fatal("QuotaExceededError"),
            LabscanError::InvalidHost(_) => ErrorClassification::fatal("InvalidHostError"),
            LabscanError::Config(_) => ErrorClassification::fatal("ConfigError"),

            // Terminal outcomes of a run
            LabscanError::RemoteReported { .. } => ErrorClassification::fatal("RemoteReportedError"),
            LabscanError::Timeout { .. } => ErrorClassification::fatal("TimeoutError"),
            LabscanError::Cancelled { .. } => ErrorClassification::fatal("CancelledError"),

            // Local plumbing
            LabscanError::Cache(_) => ErrorClassification::fatal("CacheError"),
            LabscanError::Io(_) => ErrorClassification::retryable("IoError"),
            LabscanError::Json(_) => ErrorClassification::fatal("JsonError"),
            LabscanError::Yaml(_) => ErrorClassification::fatal("YamlError"),
            LabscanError::Database(_) => ErrorClassification::fatal("DatabaseError"),
            LabscanError::Internal(_) => ErrorClassification::fatal("InternalError"),
        }
    }
}
