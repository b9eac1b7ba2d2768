//! Wellness endpoints. Each handler names its [`Endpoint`]; validation,
//! prompt building and the model exchange are shared in [`respond`].

use crate::dtos::{SuccessEnvelope, WellnessRequest};
use crate::prompts::Endpoint;
use crate::services::metrics;
use crate::startup::AppState;
use axum::extract::State;
use service_core::error::AppError;

type WellnessResult = Result<SuccessEnvelope, AppError>;

pub async fn analyze_food(State(state): State<AppState>, request: WellnessRequest) -> WellnessResult {
    respond(&state, Endpoint::AnalyzeFood, request).await
}

pub async fn chat(State(state): State<AppState>, request: WellnessRequest) -> WellnessResult {
    respond(&state, Endpoint::Chat, request).await
}

pub async fn daily_tips(State(state): State<AppState>, request: WellnessRequest) -> WellnessResult {
    respond(&state, Endpoint::DailyTips, request).await
}

pub async fn mood(State(state): State<AppState>, request: WellnessRequest) -> WellnessResult {
    respond(&state, Endpoint::Mood, request).await
}

pub async fn exercise_recommendations(
    State(state): State<AppState>,
    request: WellnessRequest,
) -> WellnessResult {
    respond(&state, Endpoint::ExerciseRecommendations, request).await
}

pub async fn health_assessment(
    State(state): State<AppState>,
    request: WellnessRequest,
) -> WellnessResult {
    respond(&state, Endpoint::HealthAssessment, request).await
}

pub async fn goal_tracking(State(state): State<AppState>, request: WellnessRequest) -> WellnessResult {
    respond(&state, Endpoint::GoalTracking, request).await
}

/// Validate, dispatch through the gateway and wrap the reply.
///
/// Gateway failures become `502` unless `failures_as_text` is set, in which
/// case the failure message is returned in place of the reply.
async fn respond(state: &AppState, endpoint: Endpoint, request: WellnessRequest) -> WellnessResult {
    let prompt = endpoint.prepare(request).inspect_err(|e| {
        tracing::info!(endpoint = endpoint.name(), error = %e, "Rejected wellness request");
        metrics::record_request(endpoint.name(), "rejected");
    })?;

    let session = state.sessions.acquire();
    tracing::info!(
        endpoint = endpoint.name(),
        attachments = prompt.attachments.len(),
        "Dispatching wellness prompt"
    );

    match state.gateway.dispatch(&session, prompt).await {
        Ok(reply) => {
            metrics::record_request(endpoint.name(), "success");
            Ok(SuccessEnvelope::new(endpoint.response_field(), reply))
        }
        Err(e) if state.config.http.failures_as_text => {
            metrics::record_request(endpoint.name(), "failed_as_text");
            Ok(SuccessEnvelope::new(endpoint.response_field(), e.to_string()))
        }
        Err(e) => {
            metrics::record_request(endpoint.name(), "failed");
            Err(AppError::BadGateway(e.to_string()))
        }
    }
}
