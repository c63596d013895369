use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single entry of the GraphQL `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// The decoded response envelope of a GraphQL request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_errors")]
    pub errors: Vec<GraphQLError>,
}

fn deserialize_errors<'de, D>(deserializer: D) -> Result<Vec<GraphQLError>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<GraphQLError>>::deserialize(deserializer)?.unwrap_or_default())
}

impl GraphQLResponse {
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(errors: Vec<GraphQLError>) -> Self {
        Self { data: None, errors }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Joins every error message into one line.
    pub fn error_summary(&self) -> String {
        summarize_errors(&self.errors)
    }

    /// Returns the value selected under `name` (usually an alias), treating an
    /// explicit JSON `null` the same as a missing entry.
    pub fn named_result(&self, name: &str) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|data| data.get(name))
            .filter(|value| !value.is_null())
    }
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

pub(crate) fn summarize_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|err| err.message.as_str())
        .filter(|msg| !msg.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_errors_decode_as_empty() {
        let response: GraphQLResponse =
            serde_json::from_value(json!({"data": {"m0": {"id": "a"}}, "errors": null})).unwrap();
        assert!(!response.has_errors());
        assert_eq!(response.named_result("m0"), Some(&json!({"id": "a"})));
    }

    #[test]
    fn named_result_skips_nulls() {
        let response = GraphQLResponse::with_data(json!({"m0": null, "m1": {"id": "b"}}));
        assert!(response.named_result("m0").is_none());
        assert!(response.named_result("m1").is_some());
        assert!(response.named_result("m2").is_none());
    }

    #[test]
    fn summary_joins_messages() {
        let response = GraphQLResponse::with_errors(vec![
            GraphQLError::new("first"),
            GraphQLError::new(""),
            GraphQLError::new("second"),
        ]);
        assert_eq!(response.error_summary(), "first; second");
    }
}
