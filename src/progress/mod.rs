pub mod events;
pub mod renderer;

pub use events::AssessmentEvent;
pub use renderer::AssessmentProgress;
