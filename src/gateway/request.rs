use serde::{Deserialize, Serialize};

/// How the first `analyze` call of a run asks for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Ignore remote cached reports and start a fresh assessment.
    StartNew,
    /// Accept a remote cached report no older than `max_age_hours`.
    FromCache { max_age_hours: u32 },
    /// Reattach to whatever the service is already running for this host.
    Resume,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartNew => "start-new",
            Self::FromCache { .. } => "from-cache",
            Self::Resume => "resume",
        }
    }
}

/// Parameters of an `analyze` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub host: String,
    pub mode: RequestMode,
    /// Publish the result on the public SSL Labs board.
    pub share_publicly: bool,
    pub ignore_mismatch: bool,
}

impl AnalyzeRequest {
    pub fn new(host: &str, mode: RequestMode) -> Self {
        Self {
            host: host.to_string(),
            mode,
            share_publicly: false,
            ignore_mismatch: false,
        }
    }

    /// The request used for every poll after the first.
    ///
    /// `startNew` must never be repeated or the service restarts the scan;
    /// remote cache acceptance is kept so a cached report stays reachable.
    pub fn follow_up(&self) -> Self {
        let mode = match self.mode {
            RequestMode::StartNew => RequestMode::Resume,
            other => other,
        };
        Self { mode, ..self.clone() }
    }

    /// Query pairs for the `analyze` endpoint.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("host", self.host.clone()),
            ("publish", on_off(self.share_publicly)),
            ("ignoreMismatch", on_off(self.ignore_mismatch)),
            ("all", "done".to_string()),
        ];
        match self.mode {
            RequestMode::StartNew => pairs.push(("startNew", "on".to_string())),
            RequestMode::FromCache { max_age_hours } => {
                pairs.push(("fromCache", "on".to_string()));
                pairs.push(("maxAge", max_age_hours.to_string()));
            }
            RequestMode::Resume => {}
        }
        pairs
    }

    /// Flags that change the content of the finished report.
    pub fn report_flags(&self) -> String {
        let mut flags = Vec::new();
        if self.ignore_mismatch {
            flags.push("ignore-mismatch");
        }
        if self.share_publicly {
            flags.push("public");
        }
        if flags.is_empty() {
            "default".to_string()
        } else {
            flags.join("+")
        }
    }

    /// Request mode plus report flags, e.g. `from-cache+ignore-mismatch`.
    /// This is the `mode` half of a cache key.
    pub fn cache_mode(&self) -> String {
        let mut parts = vec![self.mode.as_str()];
        if self.ignore_mismatch {
            parts.push("ignore-mismatch");
        }
        if self.share_publicly {
            parts.push("public");
        }
        parts.join("+")
    }
}

fn on_off(flag: bool) -> String {
    if flag { "on" } else { "off" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(pairs: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_start_new_query() {
        let req = AnalyzeRequest::new("example.com", RequestMode::StartNew);
        let pairs = req.query_pairs();
        assert_eq!(value(&pairs, "host"), Some("example.com"));
        assert_eq!(value(&pairs, "startNew"), Some("on"));
        assert_eq!(value(&pairs, "publish"), Some("off"));
        assert_eq!(value(&pairs, "all"), Some("done"));
        assert!(value(&pairs, "fromCache").is_none());
    }

    #[test]
    fn test_from_cache_query() {
        let req = AnalyzeRequest::new("example.com", RequestMode::FromCache { max_age_hours: 5 });
        let pairs = req.query_pairs();
        assert_eq!(value(&pairs, "fromCache"), Some("on"));
        assert_eq!(value(&pairs, "maxAge"), Some("5"));
        assert!(value(&pairs, "startNew").is_none());
    }

    #[test]
    fn test_follow_up_never_restarts() {
        let req = AnalyzeRequest::new("example.com", RequestMode::StartNew);
        let next = req.follow_up();
        assert_eq!(next.mode, RequestMode::Resume);
        assert!(value(&next.query_pairs(), "startNew").is_none());

        let cached = AnalyzeRequest::new("example.com", RequestMode::FromCache { max_age_hours: 2 });
        assert_eq!(cached.follow_up().mode, cached.mode);
    }

    #[test]
    fn test_report_flags() {
        let mut req = AnalyzeRequest::new("example.com", RequestMode::Resume);
        assert_eq!(req.report_flags(), "default");
        req.ignore_mismatch = true;
        req.share_publicly = true;
        assert_eq!(req.report_flags(), "ignore-mismatch+public");
    }

    #[test]
    fn test_cache_mode_includes_request_mode() {
        let mut req = AnalyzeRequest::new("example.com", RequestMode::StartNew);
        assert_eq!(req.cache_mode(), "start-new");
        req.mode = RequestMode::FromCache { max_age_hours: 3 };
        assert_eq!(req.cache_mode(), "from-cache");
        req.ignore_mismatch = true;
        assert_eq!(req.cache_mode(), "from-cache+ignore-mismatch");
        req.mode = RequestMode::Resume;
        req.share_publicly = true;
        assert_eq!(req.cache_mode(), "resume+ignore-mismatch+public");
    }
}
