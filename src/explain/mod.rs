//! Selection explanation core
//!
//! - `normalize`: flattening of untrusted backend values into display text
//! - `classifier`: heuristic content mode of a selection
//! - `store` / `cache`: persisted fingerprint cache with lazy 7-day expiry
//! - `client`: HTTP client for the local explanation backend
//! - `router`: `EXPLAIN_REQUEST` / `ACTION_INVOKE` message handling
//! - `settings`: the persisted `sendToBackend` consent flag

pub mod cache;
pub mod classifier;
pub mod client;
pub mod models;
pub mod normalize;
pub mod router;
pub mod settings;
pub mod store;

pub use cache::{fingerprint, Clock, ManualClock, ResultCache, SystemClock};
pub use classifier::{classify, resolve_mode};
pub use client::{ExplainBackend, HttpBackend};
pub use models::{
    Action, BackendAction, BackendFailure, BackendPayload, BackendReply, Entity, ExplainResult,
    InboundMessage, Mode, OutboundMessage, PageContext, RouterReply,
};
pub use normalize::normalize;
pub use router::MessageRouter;
pub use settings::{Settings, SettingsStore};
pub use store::{FileStore, KvStore, MemoryStore};
