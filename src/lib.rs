//! Clarity Assistant background service
//!
//! Receives text selections from the page-side UI, explains them through a
//! local backend and keeps a 7-day fingerprint cache of the results.

pub mod api;
pub mod config;
pub mod error;
pub mod explain;
pub mod metrics;

pub use config::Config;
pub use error::{ClarityError, Result};
