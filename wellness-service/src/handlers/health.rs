use crate::services::metrics::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "wellness-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: the model provider must be reachable.
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let provider = state.gateway.provider_name();
    state.gateway.health_check().await.map_err(|e| {
        tracing::warn!(provider, error = %e, "Model provider not ready");
        AppError::ServiceUnavailable(format!("{} provider: {}", provider, e))
    })?;

    Ok(Json(json!({
        "status": "ready",
        "provider": provider
    })))
}

/// Prometheus scrape endpoint.
pub async fn metrics() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        get_metrics(),
    )
}
