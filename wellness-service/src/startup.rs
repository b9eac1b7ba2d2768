//! Application startup and lifecycle management.

use crate::config::{ProviderKind, SessionScopeKind, WellnessConfig};
use crate::handlers;
use crate::models::{ConversationSession, SessionScope};
use crate::prompts::Endpoint;
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::services::providers::mock::MockProvider;
use crate::services::providers::ModelProvider;
use crate::services::{FileStore, LocalFileStore, ModelGateway};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: WellnessConfig,
    pub gateway: Arc<ModelGateway>,
    pub sessions: SessionScope,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    /// Build the application with the provider named in the configuration.
    pub async fn build(config: WellnessConfig) -> Result<Self, AppError> {
        let provider: Arc<dyn ModelProvider> = match config.models.provider {
            ProviderKind::Gemini => {
                let provider = GeminiProvider::new(GeminiConfig {
                    api_key: config.google.api_key.clone(),
                    model: config.models.text_model.clone(),
                    api_base: config.google.api_base.clone(),
                    timeout: Duration::from_secs(config.google.timeout_secs),
                })
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
                Arc::new(provider)
            }
            ProviderKind::Mock => {
                tracing::warn!("Using mock model provider; replies are canned");
                Arc::new(MockProvider::new())
            }
        };

        tracing::info!(
            provider = provider.name(),
            model = %config.models.text_model,
            "Initialized model provider"
        );

        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an existing provider.
    pub async fn build_with_provider(
        config: WellnessConfig,
        provider: Arc<dyn ModelProvider>,
    ) -> Result<Self, AppError> {
        let store = LocalFileStore::new(&config.staging.dir).await.map_err(|e| {
            tracing::error!(
                "Failed to initialize staging directory at {}: {}",
                config.staging.dir.display(),
                e
            );
            AppError::InternalError(anyhow::Error::new(e))
        })?;

        Self::build_with(config, provider, Arc::new(store)).await
    }

    /// Build the application around an existing provider and file store.
    pub async fn build_with(
        config: WellnessConfig,
        provider: Arc<dyn ModelProvider>,
        store: Arc<dyn FileStore>,
    ) -> Result<Self, AppError> {
        let gateway = ModelGateway::new(provider, store)
            .with_system_instruction(config.models.system_instruction.clone());

        let sessions = match config.session.scope {
            SessionScopeKind::Shared => SessionScope::shared(),
            SessionScopeKind::Isolated => SessionScope::Isolated,
        };
        tracing::info!(scope = ?config.session.scope, "Conversation session scope");

        let state = AppState {
            config: config.clone(),
            gateway: Arc::new(gateway),
            sessions,
        };

        let app = router(state.clone());

        // Port 0 picks a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Wellness service listening on port {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The shared conversation, absent when sessions are isolated.
    pub fn session(&self) -> Option<Arc<ConversationSession>> {
        self.state.sessions.session().cloned()
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

fn router(state: AppState) -> Router {
    let max_body_bytes = state.config.http.max_body_bytes;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(Endpoint::AnalyzeFood.path(), post(handlers::analyze_food))
        .route(Endpoint::Chat.path(), post(handlers::chat))
        .route(
            Endpoint::DailyTips.path(),
            get(handlers::daily_tips).post(handlers::daily_tips),
        )
        .route(Endpoint::Mood.path(), post(handlers::mood))
        .route(
            Endpoint::ExerciseRecommendations.path(),
            post(handlers::exercise_recommendations),
        )
        .route(
            Endpoint::HealthAssessment.path(),
            post(handlers::health_assessment),
        )
        .route(Endpoint::GoalTracking.path(), post(handlers::goal_tracking))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
