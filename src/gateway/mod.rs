pub mod discovery;
pub mod provider;
pub mod request;
pub mod ssllabs;

pub use discovery::DiscoveringGateway;
pub use provider::AnalysisGateway;
pub use request::{AnalyzeRequest, RequestMode};
pub use ssllabs::{GatewaySettings, SslLabsGateway, DEFAULT_API_URLS};
