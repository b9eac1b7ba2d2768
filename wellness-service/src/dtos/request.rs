//! Normalized request input.
//!
//! Endpoints accept JSON objects, url-encoded forms and multipart forms.
//! [`WellnessRequest`] folds all three into one field map plus the uploaded
//! files, so prompt builders never care how the client encoded its input.

use crate::models::Attachment;
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::{header, Method, StatusCode},
    Form, Json,
};
use serde_json::{Map, Value};
use service_core::error::AppError;
use std::collections::HashMap;

/// Placeholder for optional values the client left out.
pub const NOT_SPECIFIED: &str = "not specified";

#[derive(Debug, Default, Clone)]
pub struct WellnessRequest {
    fields: Map<String, Value>,
    /// Uploaded files keyed by form field, in arrival order.
    files: Vec<(String, Attachment)>,
}

impl WellnessRequest {
    pub fn new(fields: Map<String, Value>, files: Vec<(String, Attachment)>) -> Self {
        Self { fields, files }
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::new(fields, Vec::new()),
            _ => Self::default(),
        }
    }

    /// A field the client sent with a non-null value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    pub fn has(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// The field rendered for a prompt, or `default` when absent.
    pub fn text_or(&self, name: &str, default: &str) -> String {
        self.field(name)
            .map(render_value)
            .unwrap_or_else(|| default.to_string())
    }

    /// The field rendered for a prompt, or [`NOT_SPECIFIED`].
    pub fn text(&self, name: &str) -> String {
        self.text_or(name, NOT_SPECIFIED)
    }

    pub fn has_files(&self, field: &str) -> bool {
        self.files.iter().any(|(name, _)| name == field)
    }

    /// Remove and return every file uploaded under `field`, preserving order.
    pub fn take_files(&mut self, field: &str) -> Vec<Attachment> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(name, _)| name == field);
        self.files = kept;
        taken.into_iter().map(|(_, attachment)| attachment).collect()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Render a JSON value the way it should read inside a prompt.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => NOT_SPECIFIED.to_string(),
        Value::Array(items) if items.is_empty() => "none".to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

const BODY_TOO_LARGE: &str = "Request body too large";

fn bad_request(message: String) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(message))
}

/// Map an extractor failure, keeping body-limit hits apart from malformed input.
fn rejected(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(BODY_TOO_LARGE.to_string())
    } else {
        bad_request(message)
    }
}

#[async_trait]
impl<S> FromRequest<S> for WellnessRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if req.method() == Method::GET {
            return Ok(Self::default());
        }

        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| rejected(e.status(), format!("Invalid JSON body: {}", e.body_text())))?;
            return Ok(Self::from_json(value));
        }

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| {
                    rejected(e.status(), format!("Invalid multipart body: {}", e.body_text()))
                })?;
            return read_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| rejected(e.status(), format!("Invalid form body: {}", e.body_text())))?;
            let fields = form
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            return Ok(Self::new(fields, Vec::new()));
        }

        // No recognised body: treat as an empty submission.
        Ok(Self::default())
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<WellnessRequest, AppError> {
    let mut fields = Map::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejected(e.status(), format!("Failed to read multipart field: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        let is_file = file_name.is_some()
            || content_type
                .as_deref()
                .is_some_and(|ct| !ct.starts_with("text/"));

        if is_file {
            let data = field
                .bytes()
                .await
                .map_err(|e| rejected(e.status(), format!("Failed to read file bytes: {}", e)))?
                .to_vec();
            files.push((name, Attachment::new(data, file_name, content_type)));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| rejected(e.status(), format!("Failed to read form field: {}", e)))?;
            fields.insert(name, Value::String(value));
        }
    }

    Ok(WellnessRequest::new(fields, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_null_fields_fall_back() {
        let request = WellnessRequest::from_json(json!({"time": null}));
        assert_eq!(request.text("time"), NOT_SPECIFIED);
        assert_eq!(request.text_or("fitness_level", "beginner"), "beginner");
        assert!(!request.has("time"));
    }

    #[test]
    fn values_render_for_prompts() {
        let request = WellnessRequest::from_json(json!({
            "triggers": ["work", "sleep"],
            "limitations": [],
            "age": 34,
            "mood": "tired"
        }));

        assert_eq!(request.text("triggers"), "work, sleep");
        assert_eq!(request.text("limitations"), "none");
        assert_eq!(request.text("age"), "34");
        assert_eq!(request.text("mood"), "tired");
    }

    #[test]
    fn body_limit_rejections_become_payload_too_large() {
        let err = rejected(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded".into());
        assert!(matches!(err, AppError::PayloadTooLarge(ref m) if m == BODY_TOO_LARGE));

        let err = rejected(StatusCode::BAD_REQUEST, "Invalid JSON body: eof".into());
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_object_json_is_empty() {
        let request = WellnessRequest::from_json(json!(["mood"]));
        assert_eq!(request.field_count(), 0);
        assert_eq!(request.file_count(), 0);
    }

    #[test]
    fn take_files_keeps_order_and_other_fields() {
        let mut request = WellnessRequest::new(
            Map::new(),
            vec![
                ("mood_history".into(), Attachment::from_bytes(b"1".to_vec())),
                ("other".into(), Attachment::from_bytes(b"x".to_vec())),
                ("mood_history".into(), Attachment::from_bytes(b"2".to_vec())),
            ],
        );

        let taken = request.take_files("mood_history");

        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].data, b"1");
        assert_eq!(taken[1].data, b"2");
        assert_eq!(request.file_count(), 1);
        assert!(request.has_files("other"));
    }
}
