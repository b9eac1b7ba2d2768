//! Model gateway: the single path from a prompt request to the remote model.

use crate::models::{ConversationSession, History, PromptRequest, RemoteFile, Turn, TurnOutcome};
use crate::services::file_store::{FileStore, StagedFile, StoreError};
use crate::services::metrics;
use crate::services::providers::{GenerationRequest, Message, ModelProvider, Part, ProviderError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Why a dispatch produced no reply.
///
/// The display string is the bare underlying message, which is what
/// legacy clients receive in place of an answer.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Staging(#[from] StoreError),

    #[error("{0}")]
    Upload(ProviderError),

    #[error("{0}")]
    Generation(ProviderError),
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Staging(_) => "staging",
            GatewayError::Upload(_) => "upload",
            GatewayError::Generation(_) => "generation",
        }
    }
}

pub struct ModelGateway {
    provider: Arc<dyn ModelProvider>,
    store: Arc<dyn FileStore>,
    system_instruction: Option<String>,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn ModelProvider>, store: Arc<dyn FileStore>) -> Self {
        Self {
            provider,
            store,
            system_instruction: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn health_check(&self) -> Result<(), ProviderError> {
        self.provider.health_check().await
    }

    /// Send `request` to the model within `session`.
    ///
    /// Attachments are staged and uploaded in order before generation
    /// starts. Every staged file is released exactly once whatever the
    /// outcome, and exactly one turn is appended to the session.
    #[tracing::instrument(
        name = "gateway.dispatch",
        skip_all,
        fields(session_id = %session.id(), attachments = request.attachments.len())
    )]
    pub async fn dispatch(
        &self,
        session: &ConversationSession,
        request: PromptRequest,
    ) -> Result<String, GatewayError> {
        let mut history = session.lock().await;
        let mut staged: Vec<StagedFile> = Vec::with_capacity(request.attachments.len());
        let mut uploaded: Vec<RemoteFile> = Vec::with_capacity(request.attachments.len());

        let outcome = self
            .exchange(&history, &request, &mut staged, &mut uploaded)
            .await;

        for file in &staged {
            self.store.release(file).await;
        }

        let turn_outcome = match &outcome {
            Ok(reply) => {
                metrics::record_dispatch("success");
                tracing::info!(reply_len = reply.len(), "Model replied");
                TurnOutcome::Reply(reply.clone())
            }
            Err(e) => {
                metrics::record_dispatch(e.kind());
                tracing::warn!(error = %e, stage = e.kind(), "Model dispatch failed");
                TurnOutcome::Failed(e.to_string())
            }
        };
        history.push(Turn::new(request.prompt, uploaded, turn_outcome));

        outcome
    }

    /// The fallible part of a dispatch. Staged handles and remote references
    /// are accumulated in the caller's vectors so they survive an early return.
    async fn exchange(
        &self,
        history: &History,
        request: &PromptRequest,
        staged: &mut Vec<StagedFile>,
        uploaded: &mut Vec<RemoteFile>,
    ) -> Result<String, GatewayError> {
        let provider = self.provider.name();

        for (index, attachment) in request.attachments.iter().enumerate() {
            let file = self
                .store
                .stage(&attachment.data, Some(&attachment.extension))
                .await?;
            metrics::record_staged_file();
            staged.push(file);
            let file = &staged[staged.len() - 1];

            let display_name = attachment
                .file_name
                .clone()
                .unwrap_or_else(|| format!("attachment-{}.{}", index + 1, attachment.extension));

            let started = Instant::now();
            let remote = self
                .provider
                .upload_file(file, &attachment.mime_type, &display_name)
                .await
                .map_err(|e| {
                    metrics::record_provider_error(provider, e.kind());
                    GatewayError::Upload(e)
                })?;
            metrics::record_provider_latency(provider, "upload", started.elapsed().as_secs_f64());

            tracing::debug!(index, remote = %remote.name, "Attachment uploaded");
            uploaded.push(remote);
        }

        let generation = GenerationRequest {
            system_instruction: self.system_instruction.as_deref(),
            messages: build_messages(history, &request.prompt, uploaded),
        };

        let started = Instant::now();
        let reply = self.provider.generate(&generation).await.map_err(|e| {
            metrics::record_provider_error(provider, e.kind());
            GatewayError::Generation(e)
        })?;
        metrics::record_provider_latency(provider, "generate", started.elapsed().as_secs_f64());

        Ok(reply)
    }
}

/// Replay completed turns, then the new prompt followed by its files.
fn build_messages(history: &History, prompt: &str, files: &[RemoteFile]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 1);

    for turn in history.completed() {
        messages.push(Message::user(user_parts(&turn.prompt, &turn.files)));
        if let Some(reply) = turn.reply() {
            messages.push(Message::model(reply));
        }
    }

    messages.push(Message::user(user_parts(prompt, files)));
    messages
}

fn user_parts(prompt: &str, files: &[RemoteFile]) -> Vec<Part> {
    let mut parts = Vec::with_capacity(files.len() + 1);
    parts.push(Part::Text(prompt.to_string()));
    parts.extend(files.iter().cloned().map(Part::File));
    parts
}
