use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};

/// `{"status": "success", <field>: <text>}`. The field name varies per endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessEnvelope {
    field: &'static str,
    text: String,
}

impl SuccessEnvelope {
    pub fn new(field: &'static str, text: impl Into<String>) -> Self {
        Self {
            field,
            text: text.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("status".to_string(), Value::from("success"));
        body.insert(self.field.to_string(), Value::from(self.text.clone()));
        Value::Object(body)
    }
}

impl IntoResponse for SuccessEnvelope {
    fn into_response(self) -> Response {
        Json(self.to_json()).into_response()
    }
}
