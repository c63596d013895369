use serde_json::Value;

use crate::client::GraphQLTransport;
use crate::error::{GraphQLClientError, Result};

/// Standard introspection query, deep enough for `[[T!]!]!` style wrappers.
pub const INTROSPECTION_QUERY: &str = r#"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    types {
      kind
      name
      description
      fields(includeDeprecated: true) {
        name
        description
        args { name type { ...TypeRef } }
        type { ...TypeRef }
      }
      inputFields { name description type { ...TypeRef } }
      enumValues(includeDeprecated: true) { name }
    }
  }
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType { kind name ofType { kind name } }
        }
      }
    }
  }
}
"#;

/// Fetches the endpoint's schema, returning the `data` object that holds
/// `__schema`.
pub async fn introspect(transport: &dyn GraphQLTransport) -> Result<Value> {
    let response = transport.request(INTROSPECTION_QUERY).await?;
    if response.has_errors() {
        return Err(GraphQLClientError::Introspection(response.error_summary()));
    }
    match response.data {
        Some(data) if data.get("__schema").is_some_and(Value::is_object) => Ok(data),
        _ => Err(GraphQLClientError::Introspection(
            "response carries no __schema object".to_string(),
        )),
    }
}
