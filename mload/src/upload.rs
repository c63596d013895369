//! Sends records to a live endpoint in sequential, bounded batches.

use gqlfetcher::{GraphQLResponse, GraphQLTransport};
use serde_json::Value;
use thiserror::Error;

use crate::coerce::CoerceOptions;
use crate::errors::RecordError;
use crate::mutation::{BuiltMutation, MutationTarget, build_mutation};
use crate::reader::Record;
use crate::reflector::SchemaReflector;

/// A batch whose mutation could not be built. Nothing is sent for the file.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("batch {batch} (records {first}..{end}): {source}")]
pub struct BuildError {
    pub batch: usize,
    pub first: usize,
    pub end: usize,
    #[source]
    pub source: RecordError,
}

/// Per-file upload result.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UploadOutcome {
    pub records: usize,
    pub batches: usize,
    pub errors: Vec<String>,
    pub partial: Vec<String>,
}

pub struct BatchUploader<'t> {
    transport: &'t dyn GraphQLTransport,
    batch_size: Option<usize>,
    options: CoerceOptions,
}

impl<'t> BatchUploader<'t> {
    pub fn new(transport: &'t dyn GraphQLTransport) -> Self {
        Self {
            transport,
            batch_size: None,
            options: CoerceOptions::iso(),
        }
    }

    /// `None` or `Some(0)` sends every record in one batch.
    pub fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size.filter(|size| *size > 0);
        self
    }

    pub fn with_options(mut self, options: CoerceOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds every batch up front, then sends them one at a time. Transport
    /// and GraphQL errors are recorded against their batch and the next batch
    /// is still sent.
    pub async fn upload(
        &self,
        reflector: &mut SchemaReflector<'_>,
        target: &MutationTarget<'_>,
        source: &str,
        records: &[Record],
    ) -> Result<UploadOutcome, BuildError> {
        let batches = self.build_batches(reflector, target, records)?;
        let mut outcome = UploadOutcome {
            records: records.len(),
            batches: batches.len(),
            ..UploadOutcome::default()
        };

        for (index, built) in batches.iter().enumerate() {
            let batch = index + 1;
            for warning in &built.warnings {
                log::warn!("{source}: batch {batch}: {warning}");
            }
            log::info!(
                "{source}: sending batch {batch}/{} ({} records) to {}",
                batches.len(),
                built.records,
                target.name()
            );

            match self.transport.request(&built.text).await {
                Err(err) => {
                    let message = format!("batch {batch}: {}", err.diagnostic());
                    log::error!("{source}: {message}");
                    outcome.errors.push(message);
                }
                Ok(response) if response.has_errors() => {
                    let message = format!("batch {batch}: {}", response.error_summary());
                    log::error!("{source}: {message}");
                    outcome.errors.push(message);
                }
                Ok(response) => {
                    let nulls = null_results(&response, built);
                    if nulls > 0 {
                        let message = format!(
                            "batch {batch}: {nulls} of {} mutations returned null",
                            built.records
                        );
                        log::warn!("{source}: {message}");
                        outcome.partial.push(message);
                    }
                }
            }
        }
        Ok(outcome)
    }

    fn build_batches(
        &self,
        reflector: &mut SchemaReflector<'_>,
        target: &MutationTarget<'_>,
        records: &[Record],
    ) -> Result<Vec<BuiltMutation>, BuildError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let size = self.batch_size.unwrap_or(records.len());
        records
            .chunks(size)
            .enumerate()
            .map(|(index, chunk)| {
                let first = index * size;
                build_mutation(reflector, target, chunk, self.options).map_err(|source| BuildError {
                    batch: index + 1,
                    first,
                    end: first + chunk.len(),
                    source,
                })
            })
            .collect()
    }
}

/// Counts the logical mutations of `built` whose result came back null.
fn null_results(response: &GraphQLResponse, built: &BuiltMutation) -> usize {
    built
        .aliases
        .iter()
        .map(|alias| match response.named_result(alias) {
            None => {
                if built.aliases.len() == 1 {
                    built.records
                } else {
                    1
                }
            }
            Some(Value::Array(items)) => items.iter().filter(|item| item.is_null()).count(),
            Some(_) => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use async_trait::async_trait;
    use gqlfetcher::{GraphQLClientError, GraphQLError};
    use serde_json::json;
    use std::sync::Mutex;

    const SDL: &str = r#"
        type User { id: ID! name: String }
        input UserInput { id: ID name: String }
        type Mutation {
            createUser(input: UserInput!): User
            createUsers(input: [UserInput]): [User]
        }
    "#;

    /// Replays canned responses in order and records every query.
    struct ScriptedTransport {
        responses: Mutex<Vec<gqlfetcher::Result<GraphQLResponse>>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(mut responses: Vec<gqlfetcher::Result<GraphQLResponse>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphQLTransport for ScriptedTransport {
        async fn request(&self, query: &str) -> gqlfetcher::Result<GraphQLResponse> {
            self.queries.lock().unwrap().push(query.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(GraphQLResponse::with_data(json!({}))))
        }
    }

    fn users(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| json!({"id": format!("u{i}"), "name": format!("user {i}")}))
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[tokio::test]
    async fn failed_batches_do_not_stop_later_ones() {
        let schema = Schema::from_sdl(SDL).unwrap();
        let mut reflector = SchemaReflector::new(&schema);
        let target = MutationTarget::resolve(&schema, "createUser").unwrap();
        let transport = ScriptedTransport::new(vec![
            Err(GraphQLClientError::HttpStatus {
                status: 502,
                body: "bad gateway".into(),
                errors: vec![],
            }),
            Ok(GraphQLResponse::with_errors(vec![GraphQLError::new("name taken")])),
            Ok(GraphQLResponse::with_data(json!({"m0": {"id": "u4"}, "m1": null}))),
        ]);

        let outcome = BatchUploader::new(&transport)
            .with_batch_size(Some(2))
            .upload(&mut reflector, &target, "users.csv", &users(6))
            .await
            .unwrap();

        assert_eq!(transport.queries().len(), 3);
        assert_eq!(outcome.batches, 3);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors[0].starts_with("batch 1:"));
        assert_eq!(outcome.errors[1], "batch 2: name taken");
        assert_eq!(outcome.partial, vec!["batch 3: 1 of 2 mutations returned null".to_string()]);
    }

    #[tokio::test]
    async fn build_errors_send_nothing() {
        let schema = Schema::from_sdl(SDL).unwrap();
        let mut reflector = SchemaReflector::new(&schema);
        let target = MutationTarget::resolve(&schema, "createUser").unwrap();
        let transport = ScriptedTransport::new(vec![]);

        let mut records = users(3);
        records[2].insert("name".into(), json!(["a", "b"]));
        let err = BatchUploader::new(&transport)
            .with_batch_size(Some(2))
            .upload(&mut reflector, &target, "users.csv", &records)
            .await
            .unwrap_err();

        assert_eq!(err.batch, 2);
        assert_eq!((err.first, err.end), (2, 3));
        assert!(matches!(err.source, RecordError::ShapeMismatch { .. }));
        assert!(transport.queries().is_empty());
    }

    #[tokio::test]
    async fn unbounded_batches_send_everything_at_once() {
        let schema = Schema::from_sdl(SDL).unwrap();
        let mut reflector = SchemaReflector::new(&schema);
        let target = MutationTarget::resolve(&schema, "createUsers").unwrap();
        let transport = ScriptedTransport::new(vec![Ok(GraphQLResponse::with_data(
            json!({"m0": [{"id": "u0"}, null, {"id": "u2"}]}),
        ))]);

        let outcome = BatchUploader::new(&transport)
            .with_batch_size(Some(0))
            .upload(&mut reflector, &target, "users.json", &users(3))
            .await
            .unwrap();

        assert_eq!(outcome.batches, 1);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.partial.len(), 1);
        assert!(transport.queries()[0].starts_with("mutation { m0: createUsers(input: ["));
    }
}
