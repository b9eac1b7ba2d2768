//! Attachments and prompt requests handed to the model gateway.

use serde::{Deserialize, Serialize};
use std::path::Path;

const FALLBACK_EXTENSION: &str = "tmp";
const OCTET_STREAM: &str = "application/octet-stream";

/// A user-supplied blob sent alongside a prompt.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub data: Vec<u8>,
    pub extension: String,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl Attachment {
    /// Build an attachment, inferring the extension and MIME type from
    /// whatever the client declared.
    pub fn new(data: Vec<u8>, file_name: Option<String>, content_type: Option<String>) -> Self {
        let content_type = content_type.filter(|ct| !ct.is_empty() && ct != OCTET_STREAM);

        let extension = file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(|ext| ext.to_ascii_lowercase())
            .or_else(|| content_type.as_deref().and_then(extension_for_mime))
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        let mime_type = content_type
            .or_else(|| mime_guess::from_ext(&extension).first_raw().map(str::to_string))
            .unwrap_or_else(|| OCTET_STREAM.to_string());

        Self {
            data,
            extension,
            mime_type,
            file_name,
        }
    }

    /// Bytes with no declared name or type.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::new(data, None, None)
    }
}

fn extension_for_mime(mime: &str) -> Option<String> {
    let essence = mime.split(';').next().unwrap_or(mime).trim().to_ascii_lowercase();
    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|extensions| extensions.first())
        .map(|ext| ext.to_string())
}

/// A prompt plus its attachments, built fresh for one HTTP call.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            prompt: prompt.into(),
            attachments,
        }
    }

    pub fn text(prompt: impl Into<String>) -> Self {
        Self::new(prompt, Vec::new())
    }
}

/// Reference to a file the remote model service has ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Service-side resource name, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}
