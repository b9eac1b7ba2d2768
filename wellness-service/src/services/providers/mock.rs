//! Mock provider implementation for testing and offline runs.

use super::{GenerationRequest, ModelProvider, Part, ProviderError};
use crate::models::RemoteFile;
use crate::services::file_store::StagedFile;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// What the mock saw for one upload.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub path: PathBuf,
    /// Bytes read from the staged file at upload time.
    pub data: Vec<u8>,
    pub mime_type: String,
    pub display_name: String,
}

/// Mock provider: records uploads and generation requests and answers with
/// a canned reply derived from the prompt.
#[derive(Default)]
pub struct MockProvider {
    fail_upload_at: Option<usize>,
    fail_generation: bool,
    unhealthy: bool,
    uploads: Mutex<Vec<RecordedUpload>>,
    generations: Mutex<Vec<GenerationRecord>>,
}

/// Messages sent in one generation call, flattened for assertions.
#[derive(Debug, Clone)]
pub struct GenerationRecord {
    pub system_instruction: Option<String>,
    pub message_count: usize,
    /// Text parts of the final user message.
    pub prompt: String,
    /// File references of the final user message, in order.
    pub files: Vec<RemoteFile>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the upload with zero-based index `index` (counted across calls).
    pub fn failing_upload_at(mut self, index: usize) -> Self {
        self.fail_upload_at = Some(index);
        self
    }

    pub fn failing_generation(mut self) -> Self {
        self.fail_generation = true;
        self
    }

    /// Report the backend as unreachable from `health_check`.
    pub fn unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().await.clone()
    }

    pub async fn generations(&self) -> Vec<GenerationRecord> {
        self.generations.lock().await.clone()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn upload_file(
        &self,
        file: &StagedFile,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, ProviderError> {
        let mut uploads = self.uploads.lock().await;
        let index = uploads.len();

        let data = tokio::fs::read(file.path()).await.map_err(|e| {
            ProviderError::InvalidRequest(format!("Staged file unreadable: {}", e))
        })?;
        uploads.push(RecordedUpload {
            path: file.path().to_path_buf(),
            data,
            mime_type: mime_type.to_string(),
            display_name: display_name.to_string(),
        });

        if self.fail_upload_at == Some(index) {
            return Err(ProviderError::NetworkError(format!(
                "Mock upload {} failed",
                index
            )));
        }

        Ok(RemoteFile {
            name: format!("files/mock-{}", index),
            uri: format!("mock://files/mock-{}", index),
            mime_type: mime_type.to_string(),
        })
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ProviderError> {
        let (prompt, files) = match request.messages.last() {
            Some(message) => {
                let mut text = String::new();
                let mut files = Vec::new();
                for part in &message.parts {
                    match part {
                        Part::Text(t) => text.push_str(t),
                        Part::File(f) => files.push(f.clone()),
                    }
                }
                (text, files)
            }
            None => {
                return Err(ProviderError::InvalidRequest(
                    "No messages to answer".to_string(),
                ))
            }
        };

        self.generations.lock().await.push(GenerationRecord {
            system_instruction: request.system_instruction.map(str::to_string),
            message_count: request.messages.len(),
            prompt: prompt.clone(),
            files: files.clone(),
        });

        if self.fail_generation {
            return Err(ProviderError::ApiError("Mock generation failed".to_string()));
        }

        let headline = prompt
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("(empty prompt)");

        Ok(format!(
            "Mock response for: {} [{} file(s)]",
            headline,
            files.len()
        ))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.unhealthy {
            return Err(ProviderError::NetworkError("Mock backend unreachable".to_string()));
        }
        Ok(())
    }
}
