//! User settings persisted next to the cache

use super::store::KvStore;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Store key of the consent flag
pub const SEND_TO_BACKEND_KEY: &str = "sendToBackend";

/// User-facing settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether selections may be sent to the backend at all
    #[serde(rename = "sendToBackend", default)]
    pub send_to_backend: bool,
}

/// Settings backed by a [`KvStore`]
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KvStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Current settings; unreadable values fall back to defaults
    pub async fn load(&self) -> Settings {
        match self.store.get(SEND_TO_BACKEND_KEY).await {
            Ok(Some(Value::Bool(enabled))) => Settings {
                send_to_backend: enabled,
            },
            Ok(_) => Settings::default(),
            Err(e) => {
                warn!("Could not read settings: {}", e);
                Settings::default()
            }
        }
    }

    pub async fn send_to_backend(&self) -> bool {
        self.load().await.send_to_backend
    }

    pub async fn save(&self, settings: Settings) -> Result<()> {
        self.store
            .set(SEND_TO_BACKEND_KEY, Value::Bool(settings.send_to_backend))
            .await?;
        info!(
            "Sending {}",
            if settings.send_to_backend { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}
