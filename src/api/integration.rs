//! Wiring of stores, backend client and router from configuration

use std::sync::Arc;
use tracing::info;

use crate::{
    api::handlers::AppState,
    config::Config,
    error::Result,
    explain::{
        ExplainBackend, FileStore, HttpBackend, KvStore, MemoryStore, MessageRouter, ResultCache,
        SettingsStore,
    },
};

/// File holding cached explain results
pub const CACHE_FILE: &str = "cache.json";

/// File holding user settings
pub const SETTINGS_FILE: &str = "settings.json";

/// Open the cache and settings stores
pub async fn init_stores(config: &Config) -> Result<(Arc<dyn KvStore>, Arc<dyn KvStore>)> {
    if config.storage.in_memory {
        info!("Using in-memory storage");
        let cache: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let settings: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        return Ok((cache, settings));
    }

    let dir = &config.storage.data_dir;
    info!("Using file storage in {}", dir.display());
    let cache: Arc<dyn KvStore> = Arc::new(FileStore::open(dir.join(CACHE_FILE)).await?);
    let settings: Arc<dyn KvStore> = Arc::new(FileStore::open(dir.join(SETTINGS_FILE)).await?);
    Ok((cache, settings))
}

/// Build handler state around an explicit backend
pub async fn init_state_with_backend(
    config: &Config,
    backend: Arc<dyn ExplainBackend>,
) -> Result<AppState> {
    let (cache_store, settings_store) = init_stores(config).await?;

    let cache = ResultCache::new(cache_store, config.cache.ttl());
    let router = MessageRouter::new(backend, cache)
        .with_text_prefix_chars(config.cache.text_prefix_chars);

    Ok(AppState {
        router: Arc::new(router),
        settings: SettingsStore::new(settings_store),
    })
}

/// Build handler state talking to the configured HTTP backend
pub async fn init_state(config: &Config) -> Result<AppState> {
    let backend = HttpBackend::new(&config.backend)?;
    info!("Explanation backend: {}", backend.url());
    init_state_with_backend(config, Arc::new(backend)).await
}
