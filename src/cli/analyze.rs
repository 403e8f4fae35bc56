use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use crate::cache::{ResultCache, SqliteStore};
use crate::cli::commands::AnalyzeArgs;
use crate::config::{validate_config, AssessmentConfig, LabscanConfig};
use crate::errors::LabscanError;
use crate::gateway::DiscoveringGateway;
use crate::models::HostAssessment;
use crate::pipeline::{AssessmentOrchestrator, RunOptions};
use crate::progress::{AssessmentEvent, AssessmentProgress};

pub async fn handle_analyze(args: AnalyzeArgs, config: &LabscanConfig, verbose: bool, quiet: bool) -> Result<(), LabscanError> {
    let mut options = build_run_options(&args, config)?;
    options.verbose = verbose;

    // Bound on first remote call, so cache hits work offline
    let urls = api_urls(args.api_url.as_deref(), config);
    let gateway = DiscoveringGateway::new(urls, config.gateway_settings());

    let cache_path = args.cache_path.as_ref().map(PathBuf::from).unwrap_or_else(|| config.cache_path());
    let cache = open_cache(&cache_path);

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running assessments");
            ctrl_c_token.cancel();
        }
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AssessmentEvent>();
    let renderer = tokio::spawn(async move {
        let mut progress = if quiet { AssessmentProgress::hidden() } else { AssessmentProgress::new() };
        while let Some(event) = event_rx.recv().await {
            progress.handle_event(&event);
        }
    });

    let orchestrator = AssessmentOrchestrator::new(Arc::new(gateway))
        .with_cache(cache)
        .with_cancel_token(cancel_token)
        .with_event_channel(event_tx);

    info!(hosts = args.hosts.len(), mode = options.request_mode().as_str(), "Running assessments");
    let results = futures::future::join_all(
        args.hosts.iter().map(|host| orchestrator.run(host, &options)),
    ).await;

    // Closing the channel lets the renderer drain and exit
    drop(orchestrator);
    let _ = renderer.await;

    let documents: Vec<Value> = args.hosts.iter()
        .zip(results.iter())
        .map(|(host, result)| result_document(host, result))
        .collect::<Result<_, _>>()?;
    let output = if documents.len() == 1 {
        serde_json::to_string_pretty(&documents[0])?
    } else {
        serde_json::to_string_pretty(&documents)?
    };
    println!("{}", output);

    match results.into_iter().find_map(Result::err) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// CLI flags over config file values over defaults.
pub fn build_run_options(args: &AnalyzeArgs, config: &LabscanConfig) -> Result<RunOptions, LabscanError> {
    let mut merged = config.clone();
    let assessment = merged.assessment.get_or_insert_with(AssessmentConfig::default);
    if let Some(secs) = args.poll_interval {
        assessment.poll_interval_secs = Some(secs);
    }
    if let Some(secs) = args.timeout {
        assessment.timeout_secs = Some(secs);
    }
    if let Some(n) = args.concurrency {
        assessment.detail_concurrency = Some(n);
    }
    if args.ignore_mismatch {
        assessment.ignore_mismatch = Some(true);
    }
    validate_config(&merged)?;

    let mut options = merged.run_options();
    options.use_cache = args.use_cache;
    options.resume = args.resume;
    options.share_publicly = args.publish;
    if let Some(hours) = args.max_age {
        options.max_age = Duration::from_secs(hours.saturating_mul(3600));
    }
    if args.no_store || !config.cache_enabled() {
        options.publish = false;
    }
    Ok(options)
}

pub fn api_urls(explicit: Option<&str>, config: &LabscanConfig) -> Vec<String> {
    match explicit {
        Some(url) => vec![url.to_string()],
        None => config.api_urls(),
    }
}

/// The on-disk cache, or a per-process one if the file can't be opened.
fn open_cache(path: &std::path::Path) -> ResultCache {
    match SqliteStore::open(path) {
        Ok(store) => ResultCache::new(Arc::new(store)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Result cache unavailable, using memory only");
            ResultCache::in_memory()
        }
    }
}

/// The JSON printed for one host: the report, or an error with whatever
/// state the run had reached.
pub fn result_document(host: &str, result: &Result<HostAssessment, LabscanError>) -> Result<Value, LabscanError> {
    match result {
        Ok(assessment) => Ok(serde_json::to_value(assessment)?),
        Err(e) => {
            let partial = match e.partial_assessment() {
                Some(a) => serde_json::to_value(a)?,
                None => Value::Null,
            };
            Ok(json!({
                "host": host,
                "error": {
                    "type": e.classify().error_type,
                    "message": e.to_string(),
                },
                "partial": partial,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use crate::cli::{Cli, Commands};
    use crate::gateway::RequestMode;

    fn analyze_args(argv: &[&str]) -> AnalyzeArgs {
        let mut full = vec!["labscan", "analyze"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Analyze(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: LabscanConfig = serde_yaml::from_str(
            "assessment:\n  poll_interval_secs: 20\n  timeout_secs: 600\n",
        ).unwrap();
        let options = build_run_options(&analyze_args(&["a.com", "--poll-interval", "5"]), &config).unwrap();
        assert_eq!(options.poll_interval, Duration::from_secs(5));
        assert_eq!(options.timeout, Duration::from_secs(600));
        assert!(options.publish);
        assert_eq!(options.request_mode(), RequestMode::StartNew);
    }

    #[test]
    fn test_use_cache_and_max_age() {
        let options = build_run_options(
            &analyze_args(&["a.com", "--use-cache", "--max-age", "2", "--publish"]),
            &LabscanConfig::default(),
        ).unwrap();
        assert_eq!(options.request_mode(), RequestMode::FromCache { max_age_hours: 2 });
        assert!(options.share_publicly);
    }

    #[test]
    fn test_huge_max_age_saturates() {
        let options = build_run_options(
            &analyze_args(&["a.com", "--use-cache", "--max-age", "18446744073709551615"]),
            &LabscanConfig::default(),
        ).unwrap();
        assert_eq!(options.max_age, Duration::from_secs(u64::MAX));
        assert_eq!(options.request_mode(), RequestMode::FromCache { max_age_hours: u32::MAX });
    }

    #[tokio::test]
    async fn test_cache_hit_needs_no_reachable_api() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.db");
        let path_arg = path.to_str().unwrap().to_string();
        let args = analyze_args(&[
            "example.com",
            "--use-cache",
            "--api-url",
            "http://127.0.0.1:1/api/v3",
            "--cache-path",
            &path_arg,
        ]);
        let config = LabscanConfig::default();

        {
            let cache = ResultCache::new(Arc::new(SqliteStore::open(&path).unwrap()));
            let mut report = HostAssessment::new("example.com");
            report.status = crate::models::HostStatus::Ready;
            let key = build_run_options(&args, &config).unwrap().cache_key("example.com");
            cache.store(&key, &report);
        }

        handle_analyze(args, &config, false, true).await.unwrap();
    }

    #[test]
    fn test_no_store_disables_local_publish() {
        let options = build_run_options(&analyze_args(&["a.com", "--no-store"]), &LabscanConfig::default()).unwrap();
        assert!(!options.publish);
    }

    #[test]
    fn test_invalid_cli_values_rejected() {
        let err = build_run_options(
            &analyze_args(&["a.com", "--poll-interval", "60", "--timeout", "30"]),
            &LabscanConfig::default(),
        ).unwrap_err();
        assert!(matches!(err, LabscanError::Config(_)));
        assert!(build_run_options(&analyze_args(&["a.com", "--concurrency", "0"]), &LabscanConfig::default()).is_err());
    }

    #[test]
    fn test_explicit_api_url_is_used_alone() {
        let urls = api_urls(Some("http://127.0.0.1:1/api/v3"), &LabscanConfig::default());
        assert_eq!(urls, vec!["http://127.0.0.1:1/api/v3".to_string()]);
    }

    #[test]
    fn test_error_document_carries_partial_state() {
        let mut partial = HostAssessment::new("a.com");
        partial.status_message = Some("In progress".into());
        let result = Err(LabscanError::Timeout {
            message: "too slow".into(),
            partial: Box::new(partial),
        });
        let doc = result_document("a.com", &result).unwrap();
        assert_eq!(doc["host"], "a.com");
        assert_eq!(doc["error"]["type"], "TimeoutError");
        assert_eq!(doc["partial"]["host"], "a.com");

        let doc = result_document("b.com", &Err(LabscanError::Rejected("bad host".into()))).unwrap();
        assert!(doc["partial"].is_null());
    }
}
