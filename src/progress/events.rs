use crate::models::{EndpointStatus, Grade, HostStatus};

/// Messages sent from the orchestrator to a progress display.
#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentEvent {
    /// A run began talking to the remote service
    Started {
        host: String,
        mode: String,
    },
    /// A fresh local report answered the run
    CacheHit {
        host: String,
    },
    /// The overall host status changed
    HostStatusChanged {
        host: String,
        status: HostStatus,
    },
    /// A polled endpoint summary
    EndpointProgress {
        host: String,
        ip_address: String,
        status: EndpointStatus,
        progress: Option<i32>,
    },
    /// The next poll was pushed back by the remote service
    Backoff {
        host: String,
        delay_ms: u64,
        reason: String,
    },
    /// An endpoint's detailed report arrived
    DetailFetched {
        host: String,
        ip_address: String,
    },
    /// The run finished with a READY report
    Completed {
        host: String,
        endpoints: usize,
        grade: Option<Grade>,
        duration_ms: u64,
    },
    /// The run ended without a report
    Failed {
        host: String,
        error: String,
    },
}
