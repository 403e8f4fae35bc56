use std::sync::Arc;
use std::time::Duration;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;
use crate::cache::ResultCache;
use crate::errors::{with_retry, LabscanError, RetryConfig};
use crate::gateway::{AnalysisGateway, AnalyzeRequest, RequestMode};
use crate::models::{EndpointDetail, HostAssessment, HostStatus, HostStatusSnapshot};
use crate::progress::AssessmentEvent;
use super::backoff::PollSchedule;
use super::state::{advance, AssessmentState, Phase, RunOptions};
use super::target::normalize_host;

/// Deadline used when the configured timeout does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 86_400);

/// How the race between the poll loop, the deadline and cancellation ended.
enum Outcome {
    Finished(Result<(), LabscanError>),
    TimedOut,
    Cancelled,
}

/// Drives one host assessment at a time against the remote service.
/// Independent hosts can share one orchestrator and run concurrently.
pub struct AssessmentOrchestrator {
    gateway: Arc<dyn AnalysisGateway>,
    cache: Option<ResultCache>,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<AssessmentEvent>>,
}

impl AssessmentOrchestrator {
    pub fn new(gateway: Arc<dyn AnalysisGateway>) -> Self {
        Self {
            gateway,
            cache: None,
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the orchestrator's cancel token with an external one (e.g. tied to Ctrl-C).
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Attach an event channel for streaming progress to a renderer or other consumer.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<AssessmentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: AssessmentEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Assess `host`, answering from the local cache when allowed.
    pub async fn run(&self, host: &str, options: &RunOptions) -> Result<HostAssessment, LabscanError> {
        let span = info_span!("assessment", run_id = %Uuid::new_v4(), host = %host.trim());
        self.run_inner(host, options).instrument(span).await
    }

    async fn run_inner(&self, host: &str, options: &RunOptions) -> Result<HostAssessment, LabscanError> {
        let host = normalize_host(host)?;
        let request = options.analyze_request(&host);
        let key = options.cache_key(&host);

        if options.use_cache {
            if let Some(hit) = self.cache.as_ref().and_then(|c| c.lookup(&key, options.max_age)) {
                info!(mode = %key.mode, "Using cached assessment");
                self.emit(AssessmentEvent::CacheHit { host: host.clone() });
                return Ok(hit);
            }
        }

        info!(mode = request.mode.as_str(), api = self.gateway.endpoint_name(), "Assessment started");
        self.emit(AssessmentEvent::Started {
            host: host.clone(),
            mode: request.mode.as_str().to_string(),
        });

        let started = Instant::now();
        let deadline = started.checked_add(options.timeout).unwrap_or_else(|| started + FAR_FUTURE);
        let mut state = AssessmentState::new(&host);

        let outcome = {
            let drive = self.drive(&mut state, &request, options);
            tokio::select! {
                result = drive => Outcome::Finished(result),
                _ = tokio::time::sleep_until(deadline) => Outcome::TimedOut,
                _ = self.cancel_token.cancelled() => Outcome::Cancelled,
            }
        };

        let result = match outcome {
            Outcome::Finished(Ok(())) => Ok(state.to_assessment()),
            Outcome::Finished(Err(e)) => Err(e),
            Outcome::TimedOut => Err(LabscanError::Timeout {
                message: format!("assessment of {} did not finish within {}s", host, options.timeout.as_secs()),
                partial: Box::new(state.to_assessment()),
            }),
            Outcome::Cancelled => Err(LabscanError::Cancelled {
                message: format!("assessment of {} was cancelled", host),
                partial: Box::new(state.to_assessment()),
            }),
        };

        match &result {
            Ok(assessment) => {
                if options.publish {
                    if let Some(cache) = &self.cache {
                        cache.store(&key, assessment);
                    }
                }
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    endpoints = assessment.endpoints.len(),
                    grade = ?assessment.lowest_grade(),
                    duration_ms,
                    "Assessment completed"
                );
                self.emit(AssessmentEvent::Completed {
                    host: host.clone(),
                    endpoints: assessment.endpoints.len(),
                    grade: assessment.lowest_grade(),
                    duration_ms,
                });
            }
            Err(e) => {
                warn!(error = %e, polls = state.polls, "Assessment ended without a report");
                self.emit(AssessmentEvent::Failed { host: host.clone(), error: e.to_string() });
            }
        }
        result
    }

    /// The I/O shell around [`advance`]: poll, sleep, fetch details.
    async fn drive(
        &self,
        state: &mut AssessmentState,
        request: &AnalyzeRequest,
        options: &RunOptions,
    ) -> Result<(), LabscanError> {
        let retry = RetryConfig { max_retries: options.max_retries };
        let mut concurrency = options.detail_concurrency.max(1);
        if options.check_capacity {
            concurrency = self.check_capacity(request.mode, concurrency).await?;
        }

        let gateway = self.gateway.as_ref();
        let initial = with_retry("start assessment", &retry, move || gateway.start_or_resume(request)).await?;
        self.apply_snapshot(state, &initial, options.verbose);

        let follow_up = request.follow_up();
        let mut schedule = PollSchedule::new(options.poll_interval);
        let mut consecutive_failures = 0u32;

        while state.is_polling() {
            let delay = schedule.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "Waiting before next poll");
            tokio::time::sleep(delay).await;

            match gateway.start_or_resume(&follow_up).await {
                Ok(snapshot) => {
                    consecutive_failures = 0;
                    self.apply_snapshot(state, &snapshot, options.verbose);
                }
                Err(e) => {
                    let class = e.classify();
                    consecutive_failures += 1;
                    if !class.retryable || consecutive_failures > options.max_poll_failures {
                        return Err(e);
                    }
                    if let Some(hint) = class.retry_hint {
                        schedule.note_hint(hint);
                        self.emit(AssessmentEvent::Backoff {
                            host: state.host.clone(),
                            delay_ms: hint.as_millis() as u64,
                            reason: e.to_string(),
                        });
                    }
                    warn!(
                        error_type = class.error_type,
                        attempt = consecutive_failures,
                        error = %e,
                        "Poll failed, will retry"
                    );
                }
            }
        }

        if let Phase::Failed { message } = &state.phase {
            return Err(LabscanError::RemoteReported {
                message: message.clone(),
                assessment: Box::new(state.to_assessment()),
            });
        }

        self.fetch_details(state, &retry, concurrency).await?;
        state.mark_complete();
        Ok(())
    }

    fn apply_snapshot(&self, state: &mut AssessmentState, snapshot: &HostStatusSnapshot, verbose: bool) {
        let before = state.host_status();
        *state = advance(state, snapshot);

        if snapshot.status == HostStatus::Unknown {
            warn!(status_message = ?snapshot.status_message, "Unknown host status from service");
        }
        let after = state.host_status();
        if after != before {
            info!(status = %after, endpoints = state.trackers.len(), "Host status changed");
            self.emit(AssessmentEvent::HostStatusChanged { host: state.host.clone(), status: after });
        }

        for summary in &snapshot.endpoints {
            let Some(tracker) = state.trackers.get(summary.ip_address.trim()) else {
                continue;
            };
            let endpoint = tracker.assessment();
            let progress = endpoint.progress.filter(|p| *p > -1).unwrap_or(0);
            let message = summary.status_details_message.as_deref()
                .or(endpoint.status_message.as_deref())
                .unwrap_or("");
            if verbose {
                info!(ip = %endpoint.ip_address, progress, status = %message, "Endpoint progress");
            } else {
                debug!(ip = %endpoint.ip_address, progress, status = %message, "Endpoint progress");
            }
            self.emit(AssessmentEvent::EndpointProgress {
                host: state.host.clone(),
                ip_address: endpoint.ip_address.clone(),
                status: endpoint.status,
                progress: endpoint.progress,
            });
        }
    }

    /// Ask the service for its capacity and clamp the detail fan-out to it.
    /// Transient failures are only logged; the check is advisory.
    async fn check_capacity(&self, mode: RequestMode, requested: usize) -> Result<usize, LabscanError> {
        let capacity = match self.gateway.fetch_capacity().await {
            Ok(capacity) => capacity,
            Err(e) if e.classify().retryable => {
                warn!(error = %e, "Capacity check failed, continuing");
                return Ok(requested);
            }
            Err(e) => return Err(e),
        };

        info!(
            engine_version = ?capacity.engine_version,
            criteria_version = ?capacity.criteria_version,
            current = capacity.current_assessments,
            max = capacity.max_assessments,
            "SSL Labs service info"
        );
        if let Some(message) = capacity.messages.first() {
            info!("{}", message);
        }

        let free = capacity.free_slots();
        if capacity.max_assessments <= 0 || (free == 0 && mode == RequestMode::StartNew) {
            return Err(LabscanError::QuotaExceeded(format!(
                "{} of {} assessments in use",
                capacity.current_assessments, capacity.max_assessments
            )));
        }
        Ok(requested.min(usize::try_from(free).unwrap_or(usize::MAX)).max(1))
    }

    /// Fetch every outstanding endpoint detail, `concurrency` at a time.
    async fn fetch_details(
        &self,
        state: &mut AssessmentState,
        retry: &RetryConfig,
        concurrency: usize,
    ) -> Result<(), LabscanError> {
        let pending = state.trackers.take_pending_details();
        if pending.is_empty() {
            return Ok(());
        }
        info!(count = pending.len(), concurrency, "Fetching endpoint details");

        let gateway = self.gateway.as_ref();
        let host = state.host.as_str();
        let results: Vec<(String, Result<EndpointDetail, LabscanError>)> = stream::iter(pending)
            .map(|ip| async move {
                let result = with_retry("fetch endpoint detail", retry, || {
                    gateway.fetch_endpoint_detail(host, &ip)
                }).await;
                (ip, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut first_error = None;
        for (ip, result) in results {
            match result {
                Ok(detail) => {
                    debug!(ip = %ip, certs = detail.certificate_chain().len(), "Endpoint detail received");
                    if let Some(tracker) = state.trackers.get_mut(&ip) {
                        tracker.attach_detail(detail);
                    }
                    self.emit(AssessmentEvent::DetailFetched { host: state.host.clone(), ip_address: ip });
                }
                Err(e) => {
                    warn!(ip = %ip, error = %e, "Endpoint detail fetch failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
