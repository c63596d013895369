use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{GraphQLClientError, Result};
use crate::response::GraphQLResponse;

/// The request side of a GraphQL endpoint, as seen by the loader.
#[async_trait]
pub trait GraphQLTransport: Send + Sync {
    async fn request(&self, query: &str) -> Result<GraphQLResponse>;
}

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a Value>,
}

/// Client for a single GraphQL HTTP endpoint.
#[derive(Clone, Debug)]
pub struct GraphQLClient {
    http_client: reqwest::Client,
    endpoint: String,
    headers: Vec<(String, String)>,
    bearer_token: Option<String>,
}

impl GraphQLClient {
    /// Creates a client for `endpoint`, which must be an absolute http(s) URL.
    pub fn new(endpoint: &str) -> Result<Self> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|err| GraphQLClientError::InvalidEndpoint(format!("{endpoint}: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GraphQLClientError::InvalidEndpoint(format!(
                "{endpoint}: unsupported scheme '{}'",
                url.scheme()
            )));
        }
        Ok(Self {
            http_client: reqwest::Client::new(),
            endpoint: url.to_string(),
            headers: Vec::new(),
            bearer_token: None,
        })
    }

    /// Adds a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Replaces the underlying HTTP client with one that enforces `timeout`
    /// on every request.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts a GraphQL document and decodes the response envelope.
    ///
    /// Non-2xx statuses become [`GraphQLClientError::HttpStatus`], carrying any
    /// GraphQL errors found in the body so callers can report them.
    pub async fn execute(&self, query: &str, variables: Option<&Value>) -> Result<GraphQLResponse> {
        let payload = GraphQLRequest { query, variables };

        let mut request = self.http_client.post(&self.endpoint).json(&payload);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let errors = serde_json::from_str::<GraphQLResponse>(&body)
                .map(|decoded| decoded.errors)
                .unwrap_or_default();
            return Err(GraphQLClientError::HttpStatus {
                status: status.as_u16(),
                body,
                errors,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl GraphQLTransport for GraphQLClient {
    async fn request(&self, query: &str) -> Result<GraphQLResponse> {
        log::debug!(
            "Posting {} bytes of GraphQL to {}",
            query.len(),
            self.endpoint
        );
        self.execute(query, None).await
    }
}
