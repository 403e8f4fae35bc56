use std::path::Path;
use crate::errors::LabscanError;
use super::types::LabscanConfig;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<LabscanConfig, LabscanError> {
    if !path.exists() {
        return Err(LabscanError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(LabscanError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    // An empty file is a valid, empty config
    if content.trim().is_empty() {
        return Ok(LabscanConfig::default());
    }
    let config: LabscanConfig = serde_yaml::from_str(&content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Reject settings the poll loop cannot work with.
pub fn validate_config(config: &LabscanConfig) -> Result<(), LabscanError> {
    if let Some(api) = &config.api {
        if let Some(urls) = &api.urls {
            if urls.iter().all(|u| u.trim().is_empty()) {
                return Err(LabscanError::Config("api.urls must list at least one URL".into()));
            }
            for url in urls {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(LabscanError::Config(format!("api.urls entry is not an HTTP URL: {}", url)));
                }
            }
        }
        if api.request_timeout_secs == Some(0) {
            return Err(LabscanError::Config("api.request_timeout_secs must be positive".into()));
        }
    }

    let options = config.run_options();
    if options.poll_interval.is_zero() {
        return Err(LabscanError::Config("assessment.poll_interval_secs must be positive".into()));
    }
    if options.timeout < options.poll_interval {
        return Err(LabscanError::Config(format!(
            "assessment.timeout_secs ({}) is shorter than the poll interval ({})",
            options.timeout.as_secs(),
            options.poll_interval.as_secs()
        )));
    }
    if options.detail_concurrency == 0 {
        return Err(LabscanError::Config("assessment.detail_concurrency must be at least 1".into()));
    }

    if let Some(cache) = &config.cache {
        if cache.enabled == Some(false) && cache.path.is_some() {
            warn!("cache.path is set but the cache is disabled");
        }
    }

    Ok(())
}
