use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::remote::{CertificateSummary, EndpointDetail};
use super::status::{EndpointStatus, Grade, HostStatus};

/// One analysis run of a host, and the report it finally produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostAssessment {
    pub host: String,
    pub status: HostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Endpoints in the order the service first reported them.
    #[serde(default)]
    pub endpoints: Vec<EndpointAssessment>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_version: Option<String>,
}

impl HostAssessment {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            status: HostStatus::Dns,
            status_message: None,
            endpoints: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            engine_version: None,
            criteria_version: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn endpoint(&self, ip_address: &str) -> Option<&EndpointAssessment> {
        self.endpoints.iter().find(|e| e.ip_address == ip_address)
    }

    /// Worst grade across all endpoints, if any endpoint has one.
    pub fn lowest_grade(&self) -> Option<Grade> {
        self.endpoints
            .iter()
            .filter_map(|e| e.grade)
            .max_by_key(|g| g.rank())
    }
}

/// Assessment of one resolved IP address of the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointAssessment {
    pub ip_address: String,
    pub status: EndpointStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub detail: Option<EndpointDetail>,
}

impl EndpointAssessment {
    pub fn new(ip_address: &str) -> Self {
        Self {
            ip_address: ip_address.to_string(),
            status: EndpointStatus::Unknown,
            status_message: None,
            progress: None,
            grade: None,
            detail: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn certificate_chain(&self) -> Vec<CertificateSummary> {
        self.detail
            .as_ref()
            .map(EndpointDetail::certificate_chain)
            .unwrap_or_default()
    }
}
