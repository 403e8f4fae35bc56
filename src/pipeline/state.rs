use std::time::Duration;
use chrono::{DateTime, Utc};
use crate::cache::CacheKey;
use crate::gateway::{AnalyzeRequest, RequestMode};
use crate::models::{HostAssessment, HostStatus, HostStatusSnapshot};
use super::tracker::TrackerSet;

/// Per-run knobs for [`super::AssessmentOrchestrator::run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Answer from the local result cache when a fresh report exists, and
    /// ask the service for its cached report otherwise.
    pub use_cache: bool,
    /// Write the finished report to the local result cache.
    pub publish: bool,
    pub max_age: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Log per-endpoint progress at info instead of debug.
    pub verbose: bool,
    /// Reattach to a running remote assessment without starting one.
    pub resume: bool,
    /// Publish on the public SSL Labs results board.
    pub share_publicly: bool,
    pub ignore_mismatch: bool,
    pub detail_concurrency: usize,
    pub check_capacity: bool,
    pub max_retries: u32,
    pub max_poll_failures: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: false,
            publish: true,
            max_age: Duration::from_secs(5 * 3600),
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30 * 60),
            verbose: false,
            resume: false,
            share_publicly: false,
            ignore_mismatch: false,
            detail_concurrency: 4,
            check_capacity: true,
            max_retries: 3,
            max_poll_failures: 5,
        }
    }
}

impl RunOptions {
    pub fn request_mode(&self) -> RequestMode {
        if self.resume {
            RequestMode::Resume
        } else if self.use_cache {
            let hours = self.max_age.as_secs().div_ceil(3600).max(1);
            RequestMode::FromCache { max_age_hours: u32::try_from(hours).unwrap_or(u32::MAX) }
        } else {
            RequestMode::StartNew
        }
    }

    pub fn analyze_request(&self, host: &str) -> AnalyzeRequest {
        AnalyzeRequest {
            share_publicly: self.share_publicly,
            ignore_mismatch: self.ignore_mismatch,
            ..AnalyzeRequest::new(host, self.request_mode())
        }
    }

    pub fn cache_key(&self, host: &str) -> CacheKey {
        CacheKey::new(host, &self.analyze_request(host).cache_mode())
    }
}

/// Where a run stands between polls.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Nothing heard from the service yet.
    Starting,
    Resolving,
    Assessing,
    /// The service reported READY; endpoint details are still to be fetched.
    AwaitingDetails,
    Complete,
    Failed { message: String },
}

/// Everything the orchestrator knows about one host between polls.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentState {
    pub host: String,
    pub phase: Phase,
    pub trackers: TrackerSet,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status_message: Option<String>,
    pub engine_version: Option<String>,
    pub criteria_version: Option<String>,
    pub polls: u32,
}

impl AssessmentState {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            phase: Phase::Starting,
            trackers: TrackerSet::new(),
            started_at: Utc::now(),
            completed_at: None,
            status_message: None,
            engine_version: None,
            criteria_version: None,
            polls: 0,
        }
    }

    /// True while the poll loop must keep asking the service.
    pub fn is_polling(&self) -> bool {
        matches!(self.phase, Phase::Starting | Phase::Resolving | Phase::Assessing)
    }

    /// Overall status as exposed on the report. READY only once every
    /// endpoint is terminal and its detail has been merged.
    pub fn host_status(&self) -> HostStatus {
        match self.phase {
            Phase::Starting | Phase::Resolving => HostStatus::Dns,
            Phase::Assessing | Phase::AwaitingDetails => HostStatus::InProgress,
            Phase::Complete => HostStatus::Ready,
            Phase::Failed { .. } => HostStatus::Error,
        }
    }

    pub fn mark_complete(&mut self) {
        if self.phase == Phase::AwaitingDetails && self.trackers.all_terminal() {
            self.phase = Phase::Complete;
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn to_assessment(&self) -> HostAssessment {
        HostAssessment {
            host: self.host.clone(),
            status: self.host_status(),
            status_message: self.status_message.clone(),
            endpoints: self.trackers.snapshot(),
            started_at: self.started_at,
            completed_at: self.completed_at,
            engine_version: self.engine_version.clone(),
            criteria_version: self.criteria_version.clone(),
        }
    }
}

/// Fold one `analyze` response into the run state.
///
/// Pure: no I/O and no clock reads except stamping the completion time of
/// a remote failure. Responses arriving after the loop has left the polling
/// phases are ignored.
pub fn advance(state: &AssessmentState, snapshot: &HostStatusSnapshot) -> AssessmentState {
    let mut next = state.clone();
    if !state.is_polling() {
        return next;
    }

    next.polls += 1;
    if snapshot.status_message.is_some() {
        next.status_message = snapshot.status_message.clone();
    }
    if snapshot.engine_version.is_some() {
        next.engine_version = snapshot.engine_version.clone();
    }
    if snapshot.criteria_version.is_some() {
        next.criteria_version = snapshot.criteria_version.clone();
    }

    match snapshot.status {
        HostStatus::Dns => {
            next.trackers.apply(&snapshot.endpoints);
            next.phase = Phase::Resolving;
        }
        HostStatus::InProgress => {
            next.trackers.apply(&snapshot.endpoints);
            next.phase = Phase::Assessing;
        }
        HostStatus::Ready => {
            next.trackers.apply(&snapshot.endpoints);
            next.trackers.finalize_all();
            next.phase = Phase::AwaitingDetails;
        }
        HostStatus::Error => {
            let message = snapshot
                .status_message
                .clone()
                .unwrap_or_else(|| "remote service reported an error".to_string());
            next.phase = Phase::Failed { message };
            next.completed_at = Some(Utc::now());
        }
        // Unrecognized: keep the phase and poll again
        HostStatus::Unknown => {
            next.trackers.apply(&snapshot.endpoints);
        }
    }
    next
}
