//! Wire types for the SSL Labs API v3 responses this client consumes.
//!
//! Every field is optional or defaulted: the service adds fields over time
//! and omits others depending on progress, and none of that should turn a
//! poll into a hard failure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use super::status::{Grade, HostStatus};

/// Treat `null` the same as a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response of `analyze`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostStatusSnapshot {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub status: HostStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub test_time: Option<i64>,
    #[serde(default)]
    pub engine_version: Option<String>,
    #[serde(default)]
    pub criteria_version: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub endpoints: Vec<EndpointSummary>,
}

impl HostStatusSnapshot {
    pub fn with_status(status: HostStatus) -> Self {
        Self { status, ..Default::default() }
    }
}

/// Lightweight per-endpoint record embedded in `analyze` responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    #[serde(default, deserialize_with = "null_default")]
    pub ip_address: String,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub status_details_message: Option<String>,
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub progress: Option<i32>,
    /// Estimated seconds until completion.
    #[serde(default)]
    pub eta: Option<i64>,
}

impl EndpointSummary {
    pub fn new(ip_address: &str, status_message: &str) -> Self {
        Self {
            ip_address: ip_address.to_string(),
            status_message: Some(status_message.to_string()),
            ..Default::default()
        }
    }
}

/// Full report for one endpoint, as returned by `getEndpointData`.
///
/// `details` is kept opaque; only the certificate chain is read back out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDetail {
    #[serde(default, deserialize_with = "null_default")]
    pub ip_address: String,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub progress: Option<i32>,
    #[serde(default)]
    pub details: Value,
}

/// One certificate from `details.chain.certs[]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub subject: String,
    /// Issue bitmask as reported by the service; 0 means no issues.
    pub issues: i64,
}

impl EndpointDetail {
    pub fn certificate_chain(&self) -> Vec<CertificateSummary> {
        self.details
            .pointer("/chain/certs")
            .and_then(Value::as_array)
            .map(|certs| {
                certs
                    .iter()
                    .map(|cert| CertificateSummary {
                        subject: cert
                            .get("subject")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        issues: cert.get("issues").and_then(Value::as_i64).unwrap_or(0),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Response of `info`: remote capacity and engine metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCapacity {
    #[serde(default)]
    pub engine_version: Option<String>,
    #[serde(default)]
    pub criteria_version: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub max_assessments: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub current_assessments: i64,
    #[serde(default)]
    pub client_max_assessments: Option<i64>,
    /// Milliseconds to wait between starting new assessments.
    #[serde(default)]
    pub new_assessment_cool_off: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub messages: Vec<String>,
}

impl ServiceCapacity {
    /// Assessments this client may still start right now.
    pub fn free_slots(&self) -> i64 {
        let limit = self.client_max_assessments.unwrap_or(self.max_assessments);
        (limit.min(self.max_assessments) - self.current_assessments).max(0)
    }
}

/// Error body sent with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, deserialize_with = "null_default")]
    pub errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// `field: message; other: message`, or `None` when nothing was listed.
    pub fn summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let joined = self
            .errors
            .iter()
            .map(|e| {
                let message = e.message.as_deref().unwrap_or("Unknown error");
                match e.field.as_deref().filter(|f| !f.is_empty()) {
                    Some(field) => format!("{}: {}", field, message),
                    None => message.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        Some(joined)
    }
}
