use std::sync::OnceLock;
use regex::Regex;
use crate::errors::LabscanError;

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)*$")
            .expect("hostname pattern is valid")
    })
}

/// Reduce user input (hostname or URL) to the bare lowercase hostname the
/// service expects.
pub fn normalize_host(target: &str) -> Result<String, LabscanError> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(LabscanError::InvalidHost("host must not be empty".into()));
    }

    // scheme://host:port/path -> host:port/path
    let after_scheme = trimmed.split_once("://").map(|(_, rest)| rest).unwrap_or(trimmed);
    let host_port = after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(after_scheme);
    let host = host_port.split(':').next().unwrap_or(host_port);
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    if host.len() > 253 || !hostname_pattern().is_match(&host) {
        return Err(LabscanError::InvalidHost(format!("'{}' is not a valid hostname", target)));
    }
    Ok(host)
}
