use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::gateway::{GatewaySettings, DEFAULT_API_URLS};
use crate::pipeline::RunOptions;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LabscanConfig {
    pub api: Option<ApiConfig>,
    pub assessment: Option<AssessmentConfig>,
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiConfig {
    /// Candidate base URLs, tried in order until one answers.
    pub urls: Option<Vec<String>>,
    pub request_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AssessmentConfig {
    pub poll_interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub max_poll_failures: Option<u32>,
    pub detail_concurrency: Option<usize>,
    pub ignore_mismatch: Option<bool>,
    pub check_capacity: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CacheConfig {
    pub enabled: Option<bool>,
    pub path: Option<String>,
    pub max_age_hours: Option<u64>,
}

impl LabscanConfig {
    pub fn api_urls(&self) -> Vec<String> {
        self.api.as_ref()
            .and_then(|a| a.urls.clone())
            .unwrap_or_else(|| DEFAULT_API_URLS.iter().map(|u| u.to_string()).collect())
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        let mut settings = GatewaySettings::default();
        if let Some(api) = &self.api {
            if let Some(secs) = api.request_timeout_secs {
                settings.request_timeout = Duration::from_secs(secs);
            }
            if let Some(agent) = &api.user_agent {
                settings.user_agent = agent.clone();
            }
        }
        settings
    }

    /// Run options with every value the file sets applied over the defaults.
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::default();
        if let Some(a) = &self.assessment {
            if let Some(secs) = a.poll_interval_secs {
                options.poll_interval = Duration::from_secs(secs);
            }
            if let Some(secs) = a.timeout_secs {
                options.timeout = Duration::from_secs(secs);
            }
            options.max_retries = a.max_retries.unwrap_or(options.max_retries);
            options.max_poll_failures = a.max_poll_failures.unwrap_or(options.max_poll_failures);
            options.detail_concurrency = a.detail_concurrency.unwrap_or(options.detail_concurrency);
            options.ignore_mismatch = a.ignore_mismatch.unwrap_or(options.ignore_mismatch);
            options.check_capacity = a.check_capacity.unwrap_or(options.check_capacity);
        }
        if let Some(c) = &self.cache {
            if let Some(hours) = c.max_age_hours {
                options.max_age = Duration::from_secs(hours.saturating_mul(3600));
            }
            options.publish = c.enabled.unwrap_or(options.publish);
        }
        options
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.as_ref().and_then(|c| c.enabled).unwrap_or(true)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache.as_ref()
            .and_then(|c| c.path.as_deref())
            .map(expand_home)
            .unwrap_or_else(default_cache_path)
    }
}

/// `<user cache dir>/labscan/results.db`, or a dot directory under the
/// working directory when the platform has no cache dir.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("labscan"))
        .unwrap_or_else(|| PathBuf::from(".labscan"))
        .join("results.db")
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
