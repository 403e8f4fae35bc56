pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod pipeline;
pub mod progress;
