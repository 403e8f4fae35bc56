use async_trait::async_trait;
use crate::errors::LabscanError;
use crate::models::{EndpointDetail, HostStatusSnapshot, ServiceCapacity};
use super::request::AnalyzeRequest;

/// The remote assessment service. Implementations hold no assessment state:
/// every call maps to exactly one outbound request.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Start a host analysis, or report on the one already running
    async fn start_or_resume(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<HostStatusSnapshot, LabscanError>;

    /// Full report for one endpoint of the host
    async fn fetch_endpoint_detail(
        &self,
        host: &str,
        ip_address: &str,
    ) -> Result<EndpointDetail, LabscanError>;

    /// Remote capacity and engine metadata
    async fn fetch_capacity(&self) -> Result<ServiceCapacity, LabscanError>;

    /// Base URL or name for logging
    fn endpoint_name(&self) -> &str;
}
