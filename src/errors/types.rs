use std::time::Duration;
use thiserror::Error;
use crate::models::HostAssessment;

#[derive(Debug, Error)]
pub enum LabscanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Throttled by remote service: {message}")]
    Throttled {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Remote protocol error: {0}")]
    RemoteProtocol(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Assessment quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Remote assessment failed: {message}")]
    RemoteReported {
        message: String,
        assessment: Box<HostAssessment>,
    },

    #[error("Timeout: {message}")]
    Timeout {
        message: String,
        partial: Box<HostAssessment>,
    },

    #[error("Cancelled: {message}")]
    Cancelled {
        message: String,
        partial: Box<HostAssessment>,
    },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LabscanError {
    /// The assessment state carried by terminal run errors, if any.
    pub fn partial_assessment(&self) -> Option<&HostAssessment> {
        match self {
            Self::RemoteReported { assessment, .. } => Some(assessment),
            Self::Timeout { partial, .. } | Self::Cancelled { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Process exit code used by the CLI for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidHost(_) | Self::Yaml(_) => 2,
            Self::Timeout { .. } | Self::Cancelled { .. } => 3,
            Self::RemoteReported { .. } => 4,
            Self::Transport(_) | Self::Throttled { .. } => 5,
            Self::QuotaExceeded(_) | Self::Rejected(_) => 6,
            _ => 1,
        }
    }
}
