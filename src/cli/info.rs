use serde_json::json;
use crate::cli::analyze::api_urls;
use crate::cli::commands::InfoArgs;
use crate::config::LabscanConfig;
use crate::errors::LabscanError;
use crate::gateway::{AnalysisGateway, SslLabsGateway};

pub async fn handle_info(args: InfoArgs, config: &LabscanConfig) -> Result<(), LabscanError> {
    let urls = api_urls(args.api_url.as_deref(), config);
    let (gateway, capacity) = SslLabsGateway::discover(&urls, &config.gateway_settings()).await?;

    let output = json!({
        "api_url": gateway.endpoint_name(),
        "service": capacity,
        "free_slots": capacity.free_slots(),
        "client": {
            "version": env!("CARGO_PKG_VERSION"),
            "build_timestamp": env!("BUILD_TIMESTAMP"),
            "git_hash": option_env!("GIT_HASH").unwrap_or("unknown"),
        },
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
