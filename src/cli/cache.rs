use std::path::PathBuf;
use std::sync::Arc;
use serde_json::json;
use crate::cache::{ResultCache, SqliteStore};
use crate::cli::commands::{CacheAction, CacheArgs};
use crate::config::LabscanConfig;
use crate::errors::LabscanError;

pub async fn handle_cache(args: CacheArgs, config: &LabscanConfig) -> Result<(), LabscanError> {
    let path = args.cache_path.as_ref().map(PathBuf::from).unwrap_or_else(|| config.cache_path());
    let cache = ResultCache::new(Arc::new(SqliteStore::open(&path)?));

    match args.action {
        CacheAction::List => {
            let entries: Vec<_> = cache.entries()?
                .into_iter()
                .map(|(key, retrieved_at)| json!({
                    "host": key.host,
                    "mode": key.mode,
                    "retrieved_at": retrieved_at.to_rfc3339(),
                }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        CacheAction::Clear { host } => {
            let removed = cache.clear(host.as_deref())?;
            eprintln!("Removed {} cached report(s) from {}", removed, path.display());
        }
    }
    Ok(())
}
