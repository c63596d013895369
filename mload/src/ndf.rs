//! Conversion of records into the Normalized Document Format: `nodes/`,
//! `lists/` and `relations/` directories of numbered JSON files.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::io::AsyncWriteExt;

use crate::classify::{classify_record, raw_id};
use crate::coerce::CoerceOptions;
use crate::errors::{RecordError, Result};
use crate::reader::Record;
use crate::reflector::SchemaReflector;
use crate::utils::id::IdRegistry;
use crate::value::FieldValue;

pub const DEFAULT_FLUSH_THRESHOLD: usize = 10_000;

const TYPE_NAME_KEY: &str = "_typeName";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NdfCategory {
    Nodes,
    Lists,
    Relations,
}

impl NdfCategory {
    pub const ALL: [NdfCategory; 3] = [NdfCategory::Nodes, NdfCategory::Lists, NdfCategory::Relations];

    pub fn dir_name(self) -> &'static str {
        match self {
            NdfCategory::Nodes => "nodes",
            NdfCategory::Lists => "lists",
            NdfCategory::Relations => "relations",
        }
    }
}

/// Entries accumulated since the last flush.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NdfBuffers {
    pub nodes: Vec<Value>,
    pub lists: Vec<Value>,
    pub relations: Vec<Value>,
}

impl NdfBuffers {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.lists.is_empty() && self.relations.is_empty()
    }

    fn take(&mut self, category: NdfCategory) -> Vec<Value> {
        match category {
            NdfCategory::Nodes => std::mem::take(&mut self.nodes),
            NdfCategory::Lists => std::mem::take(&mut self.lists),
            NdfCategory::Relations => std::mem::take(&mut self.relations),
        }
    }
}

/// Owns the output root and the generation counter, which runs across every
/// file converted in one invocation.
#[derive(Debug)]
pub struct NdfWriter {
    out_dir: PathBuf,
    generation: u64,
}

impl NdfWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            generation: 0,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Number of generations written so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn file_name(generation: u64) -> String {
        format!("{generation:06}.json")
    }

    /// Writes every non-empty buffer as the next generation and clears them.
    /// Returns false, without consuming a generation number, when there was
    /// nothing to write.
    pub async fn flush(&mut self, buffers: &mut NdfBuffers) -> Result<bool> {
        if buffers.is_empty() {
            return Ok(false);
        }

        let generation = self.generation + 1;
        for category in NdfCategory::ALL {
            let values = buffers.take(category);
            if values.is_empty() {
                continue;
            }
            let path = self
                .out_dir
                .join(category.dir_name())
                .join(Self::file_name(generation));
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let count = values.len();
            let document = json!({ "valueType": category, "values": values });
            let mut file = tokio::fs::File::create(&path).await?;
            file.write_all(&serde_json::to_vec_pretty(&document)?).await?;
            file.flush().await?;
            log::debug!("Wrote {count} {} to {}", category.dir_name(), path.display());
        }
        self.generation = generation;
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdfSettings {
    /// Flush after this many converted records; 0 flushes only at the end.
    pub flush_threshold: usize,
    pub options: CoerceOptions,
}

impl Default for NdfSettings {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            options: CoerceOptions::iso(),
        }
    }
}

/// Result of converting one file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NdfOutcome {
    pub converted: usize,
    pub errors: Vec<String>,
}

impl NdfOutcome {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Converts one file's records of `type_name`, flushing through `writer`.
///
/// Bad records are counted and skipped; only write failures abort.
pub async fn convert_records(
    writer: &mut NdfWriter,
    reflector: &mut SchemaReflector<'_>,
    source: &str,
    type_name: &str,
    records: &[Record],
    settings: NdfSettings,
) -> Result<NdfOutcome> {
    reflector.require_type(type_name)?;

    let mut registry = IdRegistry::new();
    let mut buffers = NdfBuffers::default();
    let mut outcome = NdfOutcome::default();

    for (index, record) in records.iter().enumerate() {
        match convert_record(reflector, &mut registry, type_name, record, settings.options) {
            Ok((entries, warnings)) => {
                for warning in warnings {
                    log::warn!("{source}: record {index}: {warning}");
                }
                buffers.nodes.push(entries.node);
                buffers.lists.extend(entries.list);
                buffers.relations.extend(entries.relations);
                outcome.converted += 1;

                if settings.flush_threshold > 0 && outcome.converted % settings.flush_threshold == 0 {
                    writer.flush(&mut buffers).await?;
                }
            }
            Err(err) => {
                let message = match raw_id(record) {
                    Some(id) => format!("record {index} (id '{id}'): {err}"),
                    None => format!("record {index}: {err}"),
                };
                log::debug!("{source}: {message}");
                outcome.errors.push(message);
            }
        }
    }

    writer.flush(&mut buffers).await?;
    Ok(outcome)
}

struct RecordEntries {
    node: Value,
    list: Option<Value>,
    relations: Vec<Value>,
}

fn convert_record(
    reflector: &mut SchemaReflector<'_>,
    registry: &mut IdRegistry,
    type_name: &str,
    record: &Record,
    options: CoerceOptions,
) -> std::result::Result<(RecordEntries, Vec<String>), RecordError> {
    let raw = raw_id(record).ok_or(RecordError::MissingId)?;
    let id = registry.check(&raw)?;
    let classified = classify_record(reflector, type_name, record, options)?;
    registry.claim(&raw, id.clone());

    let header = || {
        let mut entry = Map::new();
        entry.insert(TYPE_NAME_KEY.to_string(), Value::String(type_name.to_string()));
        entry.insert("id".to_string(), Value::String(id.clone()));
        entry
    };
    let mut node = header();
    let mut list = header();
    let mut relations = Vec::new();

    for (name, value) in classified.fields {
        match value {
            FieldValue::Relation { to_type, ids } => {
                for target in ids {
                    relations.push(json!([
                        { TYPE_NAME_KEY: type_name, "id": id, "fieldName": name },
                        { TYPE_NAME_KEY: to_type, "id": target },
                    ]));
                }
            }
            value @ (FieldValue::List(_) | FieldValue::ObjectList(_)) => {
                list.insert(name, value.to_json());
            }
            value @ (FieldValue::Scalar(_) | FieldValue::Object(_)) => {
                node.insert(name, value.to_json());
            }
        }
    }

    let has_lists = list.len() > 2;
    Ok((
        RecordEntries {
            node: Value::Object(node),
            list: has_lists.then_some(Value::Object(list)),
            relations,
        },
        classified.warnings,
    ))
}
