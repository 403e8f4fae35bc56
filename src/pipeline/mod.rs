pub mod backoff;
pub mod orchestrator;
pub mod state;
pub mod target;
pub mod tracker;

pub use orchestrator::AssessmentOrchestrator;
pub use state::{advance, AssessmentState, Phase, RunOptions};
pub use target::normalize_host;
pub use tracker::{EndpointTracker, TrackerSet};
