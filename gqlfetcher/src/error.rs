use serde_json::Value;
use thiserror::Error;

use crate::response::{GraphQLError, summarize_errors};

/// Errors raised while talking to a GraphQL endpoint.
#[derive(Error, Debug)]
pub enum GraphQLClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {status}: {body}")]
    HttpStatus {
        status: u16,
        body: String,
        errors: Vec<GraphQLError>,
    },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("introspection failed: {0}")]
    Introspection(String),
}

pub type Result<T> = std::result::Result<T, GraphQLClientError>;

impl GraphQLClientError {
    /// Picks the most specific message available: the GraphQL `errors` list
    /// first, then a single `error`/`message` object in the body, then the
    /// error's own display text.
    pub fn diagnostic(&self) -> String {
        if let GraphQLClientError::HttpStatus { body, errors, .. } = self {
            if !errors.is_empty() {
                let summary = summarize_errors(errors);
                if !summary.is_empty() {
                    return summary;
                }
            }
            if let Some(message) = single_error_message(body) {
                return message;
            }
        }
        self.to_string()
    }
}

fn single_error_message(body: &str) -> Option<String> {
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    match object.get("error") {
        Some(Value::String(message)) => return Some(message.clone()),
        Some(Value::Object(inner)) => {
            if let Some(message) = inner.get("message").and_then(Value::as_str) {
                return Some(message.to_string());
            }
        }
        _ => {}
    }
    object
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}
