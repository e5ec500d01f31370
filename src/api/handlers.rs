//! HTTP handlers in front of the message router

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::models::{error_codes, ApiError, HealthResponse, SelectionRequest};
use crate::explain::{MessageRouter, OutboundMessage, RouterReply, Settings, SettingsStore};
use crate::metrics::METRICS;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<MessageRouter>,
    pub settings: SettingsStore,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

async fn require_consent(settings: &SettingsStore) -> Result<(), (StatusCode, Json<ApiError>)> {
    if settings.send_to_backend().await {
        return Ok(());
    }
    warn!("Refusing message: sending to backend is disabled");
    Err((
        StatusCode::FORBIDDEN,
        Json(ApiError::new(
            error_codes::CONSENT_REQUIRED,
            "Sending selections to the backend is disabled in settings",
        )),
    ))
}

/// Route one page-side message
///
/// POST /api/v1/messages
pub async fn handle_message(
    State(state): State<AppState>,
    Json(message): Json<Value>,
) -> ApiResult<RouterReply> {
    require_consent(&state.settings).await?;
    Ok(Json(state.router.dispatch(message).await))
}

/// Explain a context-menu selection
///
/// POST /api/v1/selection
pub async fn explain_selection(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<OutboundMessage> {
    if request.text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(error_codes::VALIDATION_ERROR, "text cannot be empty")),
        ));
    }
    require_consent(&state.settings).await?;
    Ok(Json(state.router.explain_selection(&request.text).await))
}

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings.load().await)
}

/// PUT /api/v1/settings
pub async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<Settings>,
) -> ApiResult<Settings> {
    match state.settings.save(settings).await {
        Ok(()) => {
            info!("Settings updated: sendToBackend={}", settings.send_to_backend);
            Ok(Json(settings))
        }
        Err(e) => {
            error!("Settings update failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(error_codes::STORAGE_ERROR, e.to_string())),
            ))
        }
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}
