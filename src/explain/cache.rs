//! Fingerprint cache for explain results with lazy TTL expiry
//!
//! Entries are only ever removed when a lookup finds them stale. There is no
//! size cap and no background sweep.

use super::models::{BackendAction, ExplainResult, Mode};
use super::store::KvStore;
use crate::metrics::METRICS;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default cache lifetime: seven days
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Default number of leading characters kept in a fingerprint
pub const DEFAULT_TEXT_PREFIX_CHARS: usize = 200;

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Real time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Build the cache key for a request
///
/// Only the first `prefix_chars` characters of the trimmed text take part,
/// so texts sharing that prefix share an entry.
pub fn fingerprint(text: &str, mode: Mode, action: BackendAction, prefix_chars: usize) -> String {
    let prefix: String = text.trim().chars().take(prefix_chars).collect();
    format!("explain:{}:mode:{}:{}", prefix, mode.as_str(), action.as_str())
}

/// Stored cache record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    ts: i64,
    value: ExplainResult,
}

/// Cache of explain results over a [`KvStore`]
pub struct ResultCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self::with_clock(store, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KvStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, ttl }
    }

    /// Get a cached result if present and not older than the TTL
    ///
    /// Stale or unreadable entries are removed. Store failures read as a miss.
    pub async fn get(&self, key: &str) -> Option<ExplainResult> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                METRICS.record_cache_lookup("miss");
                return None;
            }
            Err(e) => {
                warn!("Cache read failed: {}", e);
                METRICS.record_cache_lookup("miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Dropping unreadable cache entry: {}", e);
                self.evict(key).await;
                METRICS.record_cache_lookup("miss");
                return None;
            }
        };

        let age = self.clock.now_millis() - entry.ts;
        if age > self.ttl.as_millis() as i64 {
            debug!("Cache entry expired ({} ms old)", age);
            self.evict(key).await;
            METRICS.record_cache_lookup("expired");
            return None;
        }

        METRICS.record_cache_lookup("hit");
        Some(entry.value)
    }

    /// Store a result, overwriting any previous entry for the key
    pub async fn set(&self, key: &str, value: ExplainResult) {
        let entry = CacheEntry {
            ts: self.clock.now_millis(),
            value,
        };
        let raw = match serde_json::to_value(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not encode cache entry: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(key, raw).await {
            warn!("Cache write failed: {}", e);
        }
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.store.len().await.unwrap_or(0)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn evict(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            warn!("Cache eviction failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::store::MemoryStore;
    use serde_json::json;

    const HOUR: Duration = Duration::from_secs(60 * 60);
    const DAY: Duration = Duration::from_secs(60 * 60 * 24);

    fn result(summary: &str) -> ExplainResult {
        ExplainResult {
            summary: Some(summary.to_string()),
            ..Default::default()
        }
    }

    fn cache_with_clock() -> (ResultCache, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = ResultCache::with_clock(store.clone(), DEFAULT_TTL, clock.clone());
        (cache, store, clock)
    }

    #[test]
    fn test_fingerprint_format() {
        assert_eq!(
            fingerprint("  def f(): pass \n", Mode::Code, BackendAction::Analyze, 200),
            "explain:def f(): pass:mode:code:analyze"
        );
    }

    #[test]
    fn test_fingerprint_truncation_collides() {
        let base = "a".repeat(200);
        let k1 = fingerprint(&format!("{}XYZ", base), Mode::General, BackendAction::Rephrase, 200);
        let k2 = fingerprint(&format!("{}123", base), Mode::General, BackendAction::Rephrase, 200);
        assert_eq!(k1, k2);

        let k3 = fingerprint(&base, Mode::General, BackendAction::Brainstorm, 200);
        assert_ne!(k1, k3);
    }

    #[test]
    fn test_fingerprint_counts_characters() {
        let text = "é".repeat(300);
        let key = fingerprint(&text, Mode::General, BackendAction::Analyze, 200);
        assert_eq!(key, format!("explain:{}:mode:general:analyze", "é".repeat(200)));
    }

    #[tokio::test]
    async fn test_cache_store_and_get() {
        let (cache, _, _) = cache_with_clock();
        cache.set("k", result("first")).await;
        assert_eq!(cache.get("k").await, Some(result("first")));

        cache.set("k", result("second")).await;
        assert_eq!(cache.get("k").await, Some(result("second")));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _, _) = cache_with_clock();
        assert_eq!(cache.get("absent").await, None);
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let (cache, store, clock) = cache_with_clock();
        cache.set("k", result("v")).await;

        clock.advance(6 * DAY + 23 * HOUR);
        assert!(cache.get("k").await.is_some());

        clock.advance(2 * HOUR);
        assert!(cache.get("k").await.is_none());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_dropped() {
        let (cache, store, _) = cache_with_clock();
        store.set("k", json!({"garbage": true})).await.unwrap();

        assert!(cache.get("k").await.is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
