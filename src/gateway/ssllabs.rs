use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use crate::errors::LabscanError;
use crate::models::{ApiErrorBody, EndpointDetail, HostStatusSnapshot, ServiceCapacity};
use super::provider::AnalysisGateway;
use super::request::AnalyzeRequest;

/// Dev API first: it carries features (IPv6) ahead of stable.
pub const DEFAULT_API_URLS: &[&str] = &[
    "https://api.dev.ssllabs.com/api/v3/",
    "https://api.ssllabs.com/api/v3/",
];

/// Documented waits when the service does not send `Retry-After`.
const RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);
const SERVICE_UNAVAILABLE_WAIT: Duration = Duration::from_secs(15 * 60);
const OVERLOADED_WAIT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: format!("labscan/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub struct SslLabsGateway {
    client: Client,
    base_url: String,
}

impl SslLabsGateway {
    pub fn new(base_url: &str, settings: &GatewaySettings) -> Result<Self, LabscanError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| LabscanError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { client, base_url })
    }

    /// Bind to the first candidate URL whose `info` endpoint answers.
    ///
    /// Only transport failures move on to the next candidate; an answering
    /// service that rejects the call is reported as-is.
    pub async fn discover(
        candidates: &[String],
        settings: &GatewaySettings,
    ) -> Result<(Self, ServiceCapacity), LabscanError> {
        for url in candidates {
            let gateway = Self::new(url, settings)?;
            match gateway.fetch_capacity().await {
                Ok(capacity) => {
                    debug!(api_url = %gateway.base_url, "Using SSL Labs API");
                    return Ok((gateway, capacity));
                }
                Err(LabscanError::Transport(e)) => {
                    warn!(api_url = %url, error = %e, "API URL unavailable, trying next");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(LabscanError::Transport(
            "SSL Labs APIs are down. Please try again later.".into(),
        ))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LabscanError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| LabscanError::Transport(format!("{} request failed: {}", path, e)))?;

        let status = resp.status().as_u16();
        let retry_after = parse_retry_after(resp.headers());
        let body = resp.text().await
            .map_err(|e| LabscanError::Transport(format!("Failed to read {} response: {}", path, e)))?;

        if !(200..300).contains(&status) {
            return Err(classify_http_status(status, &body, retry_after));
        }

        serde_json::from_str(&body)
            .map_err(|e| LabscanError::RemoteProtocol(format!("Malformed {} response: {}", path, e)))
    }
}

#[async_trait]
impl AnalysisGateway for SslLabsGateway {
    async fn start_or_resume(&self, request: &AnalyzeRequest) -> Result<HostStatusSnapshot, LabscanError> {
        self.get_json("analyze", &request.query_pairs()).await
    }

    async fn fetch_endpoint_detail(&self, host: &str, ip_address: &str) -> Result<EndpointDetail, LabscanError> {
        let query = [
            ("host", host.to_string()),
            ("s", ip_address.to_string()),
            ("fromCache", "off".to_string()),
        ];
        self.get_json("getEndpointData", &query).await
    }

    async fn fetch_capacity(&self) -> Result<ServiceCapacity, LabscanError> {
        self.get_json("info", &[]).await
    }

    fn endpoint_name(&self) -> &str {
        &self.base_url
    }
}

/// Map a non-2xx response onto the error taxonomy.
pub fn classify_http_status(status: u16, body: &str, retry_after: Option<Duration>) -> LabscanError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.summary())
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        400 => LabscanError::Rejected(format!("invocation error: {}", detail)),
        429 => LabscanError::Throttled {
            message: format!("client request rate too high or too many new assessments too fast: {}", detail),
            retry_after: Some(retry_after.unwrap_or(RATE_LIMIT_WAIT)),
        },
        500 => LabscanError::Transport(format!("internal error: {}", detail)),
        503 => LabscanError::Throttled {
            message: format!("the service is not available: {}", detail),
            retry_after: Some(retry_after.unwrap_or(SERVICE_UNAVAILABLE_WAIT)),
        },
        529 => LabscanError::Throttled {
            message: format!("the service is overloaded: {}", detail),
            retry_after: Some(retry_after.unwrap_or(OVERLOADED_WAIT)),
        },
        other => LabscanError::RemoteProtocol(format!("unknown status code: {}, {}", other, detail)),
    }
}

/// `Retry-After` in its delay-seconds form.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_400_is_rejected_with_field_messages() {
        let body = r#"{"errors":[{"field":"host","message":"qp.invalid"}]}"#;
        match classify_http_status(400, body, None) {
            LabscanError::Rejected(msg) => assert_eq!(msg, "invocation error: host: qp.invalid"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_429_defaults_hint() {
        match classify_http_status(429, "slow down", None) {
            LabscanError::Throttled { retry_after, message } => {
                assert_eq!(retry_after, Some(RATE_LIMIT_WAIT));
                assert!(message.ends_with("slow down"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_retry_after_header_overrides_default() {
        let err = classify_http_status(529, "", Some(Duration::from_secs(12)));
        assert_eq!(err.classify().retry_hint, Some(Duration::from_secs(12)));
        assert!(err.classify().retryable);
    }

    #[test]
    fn test_503_is_transient() {
        let err = classify_http_status(503, "maintenance", None);
        let class = err.classify();
        assert!(class.retryable);
        assert_eq!(class.retry_hint, Some(SERVICE_UNAVAILABLE_WAIT));
    }

    #[test]
    fn test_500_is_transport() {
        assert!(matches!(classify_http_status(500, "boom", None), LabscanError::Transport(_)));
    }

    #[test]
    fn test_unexpected_status_is_protocol_error() {
        let err = classify_http_status(418, "teapot", None);
        assert!(matches!(err, LabscanError::RemoteProtocol(ref m) if m.contains("418")));
        assert!(!err.classify().retryable);
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(120)));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let gw = SslLabsGateway::new("http://localhost:9000/api/v3", &GatewaySettings::default()).unwrap();
        assert_eq!(gw.endpoint_name(), "http://localhost:9000/api/v3/");
    }
}
