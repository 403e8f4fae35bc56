pub mod assessment;
pub mod remote;
pub mod status;

pub use assessment::*;
pub use remote::*;
pub use status::*;
