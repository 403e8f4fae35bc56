pub mod analyze;
pub mod cache;
pub mod commands;
pub mod info;

pub use commands::{Cli, Commands};
