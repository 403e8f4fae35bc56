use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use crate::errors::LabscanError;
use crate::models::{EndpointDetail, HostStatusSnapshot, ServiceCapacity};
use super::provider::AnalysisGateway;
use super::request::AnalyzeRequest;
use super::ssllabs::{GatewaySettings, SslLabsGateway};

/// Picks the API URL on first use rather than up front, so runs answered
/// entirely from the local cache never touch the network.
///
/// The `info` answer obtained while picking the URL is handed to the first
/// capacity check instead of being requested a second time.
pub struct DiscoveringGateway {
    candidates: Vec<String>,
    settings: GatewaySettings,
    inner: OnceCell<SslLabsGateway>,
    discovered_capacity: Mutex<Option<ServiceCapacity>>,
}

impl DiscoveringGateway {
    pub fn new(candidates: Vec<String>, settings: GatewaySettings) -> Self {
        Self {
            candidates,
            settings,
            inner: OnceCell::new(),
            discovered_capacity: Mutex::new(None),
        }
    }

    /// True once a candidate URL has answered.
    pub fn is_bound(&self) -> bool {
        self.inner.initialized()
    }

    async fn gateway(&self) -> Result<&SslLabsGateway, LabscanError> {
        self.inner
            .get_or_try_init(|| async {
                let (gateway, capacity) = SslLabsGateway::discover(&self.candidates, &self.settings).await?;
                *self.capacity_slot()? = Some(capacity);
                Ok::<_, LabscanError>(gateway)
            })
            .await
    }

    fn capacity_slot(&self) -> Result<MutexGuard<'_, Option<ServiceCapacity>>, LabscanError> {
        self.discovered_capacity
            .lock()
            .map_err(|_| LabscanError::Internal("capacity lock poisoned".into()))
    }
}

#[async_trait]
impl AnalysisGateway for DiscoveringGateway {
    async fn start_or_resume(&self, request: &AnalyzeRequest) -> Result<HostStatusSnapshot, LabscanError> {
        self.gateway().await?.start_or_resume(request).await
    }

    async fn fetch_endpoint_detail(&self, host: &str, ip_address: &str) -> Result<EndpointDetail, LabscanError> {
        self.gateway().await?.fetch_endpoint_detail(host, ip_address).await
    }

    async fn fetch_capacity(&self) -> Result<ServiceCapacity, LabscanError> {
        let gateway = self.gateway().await?;
        let discovered = self.capacity_slot()?.take();
        match discovered {
            Some(capacity) => Ok(capacity),
            None => gateway.fetch_capacity().await,
        }
    }

    fn endpoint_name(&self) -> &str {
        self.inner.get().map(|g| g.endpoint_name()).unwrap_or("ssllabs")
    }
}
