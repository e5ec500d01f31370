//! HTTP surface used by the page-side UI

pub mod handlers;
pub mod integration;
pub mod models;
pub mod routes;

pub use handlers::AppState;
pub use integration::{init_state, init_state_with_backend};
pub use routes::build_router;
