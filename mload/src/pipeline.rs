//! Drives a load over one file or a directory of files, strictly in order.

use std::path::{Path, PathBuf};

use gqlfetcher::GraphQLTransport;

use crate::coerce::CoerceOptions;
use crate::config::LoadSettings;
use crate::errors::{LoadError, Result};
use crate::models::{FileOutcome, FileResult, FileStatus};
use crate::mutation::MutationTarget;
use crate::ndf::{NdfSettings, NdfWriter, convert_records};
use crate::reader::{InputFormat, read_records};
use crate::reflector::SchemaReflector;
use crate::report::LoadReport;
use crate::schema::Schema;
use crate::upload::BatchUploader;

/// Where records go.
pub enum Destination<'a> {
    Ndf(PathBuf),
    Endpoint(&'a dyn GraphQLTransport),
}

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Mutation to call; defaults to `create<Type>`.
    pub mutation: Option<String>,
    /// Target type; defaults to the input file stem.
    pub type_name: Option<String>,
    pub settings: LoadSettings,
}

impl LoadOptions {
    pub fn type_for(&self, path: &Path) -> String {
        self.type_name.clone().unwrap_or_else(|| file_stem(path))
    }

    pub fn mutation_for(&self, path: &Path) -> String {
        self.mutation
            .clone()
            .unwrap_or_else(|| format!("create{}", self.type_for(path)))
    }

    fn coerce_options(&self) -> CoerceOptions {
        CoerceOptions {
            iso_dates: self.settings.iso_dates(),
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lists the input files under `path`: the file itself, or the CSV and JSON
/// files of a directory sorted by name.
pub async fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut inputs = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let entry_path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if InputFormat::from_path(&entry_path).is_none() {
            log::debug!("Skipping {}: not a CSV or JSON file", entry_path.display());
            continue;
        }
        inputs.push(entry_path);
    }
    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(inputs)
}

pub struct Loader<'a> {
    schema: &'a Schema,
    destination: Destination<'a>,
    options: LoadOptions,
}

impl<'a> Loader<'a> {
    pub fn new(schema: &'a Schema, destination: Destination<'a>, options: LoadOptions) -> Self {
        Self {
            schema,
            destination,
            options,
        }
    }

    /// Processes every input under `path`. Only setup problems (bad list rule,
    /// missing path) are returned as errors; per-file failures end up in the
    /// report.
    pub async fn run(&self, path: &Path) -> Result<LoadReport> {
        let list_rule = self.options.settings.list_rule()?;
        let mut reflector = SchemaReflector::with_predicate(self.schema, list_rule);
        let inputs = collect_inputs(path).await?;
        log::info!("Loading {} file(s) from {}", inputs.len(), path.display());

        let mut result = FileResult::default();
        match &self.destination {
            Destination::Ndf(out_dir) => {
                let mut writer = NdfWriter::new(out_dir.clone());
                for input in &inputs {
                    let outcome = self.convert_file(&mut reflector, &mut writer, input).await;
                    result.merge(outcome.into());
                }
                Ok(LoadReport::new(result)
                    .with_ndf(out_dir.display().to_string(), writer.generation()))
            }
            Destination::Endpoint(transport) => {
                for input in &inputs {
                    let outcome = self.upload_file(&mut reflector, *transport, input).await;
                    result.merge(outcome.into());
                }
                Ok(LoadReport::new(result))
            }
        }
    }

    async fn convert_file(
        &self,
        reflector: &mut SchemaReflector<'_>,
        writer: &mut NdfWriter,
        path: &Path,
    ) -> FileOutcome {
        let file = path.display().to_string();
        let records = match read_records(path).await {
            Ok(records) => records,
            Err(err) => return FileOutcome::new(file, FileStatus::ReadFailed(err.to_string())),
        };

        let type_name = self.options.type_for(path);
        log::info!("Converting {} record(s) of {file} as {type_name}", records.len());
        let settings = NdfSettings {
            flush_threshold: self.options.settings.flush_threshold(),
            options: CoerceOptions::iso(),
        };

        let status = match convert_records(writer, reflector, &file, &type_name, &records, settings).await {
            Ok(outcome) => FileStatus::Converted {
                records: records.len(),
                errors: outcome.errors,
            },
            Err(LoadError::Schema(err)) => FileStatus::MutationFailed(err.to_string()),
            Err(err) => FileStatus::Converted {
                records: records.len(),
                errors: vec![format!("failed to write NDF output: {err}")],
            },
        };
        FileOutcome::new(file, status)
    }

    async fn upload_file(
        &self,
        reflector: &mut SchemaReflector<'_>,
        transport: &dyn GraphQLTransport,
        path: &Path,
    ) -> FileOutcome {
        let file = path.display().to_string();
        let records = match read_records(path).await {
            Ok(records) => records,
            Err(err) => return FileOutcome::new(file, FileStatus::ReadFailed(err.to_string())),
        };

        let mutation = self.options.mutation_for(path);
        let target = match MutationTarget::resolve(self.schema, &mutation) {
            Ok(target) => target,
            Err(err) => return FileOutcome::new(file, FileStatus::MutationFailed(err.to_string())),
        };
        log::info!("Uploading {} record(s) of {file} with {mutation}", records.len());

        let uploader = BatchUploader::new(transport)
            .with_batch_size(self.options.settings.batch_size())
            .with_options(self.options.coerce_options());
        let status = match uploader.upload(reflector, &target, &file, &records).await {
            Ok(outcome) => FileStatus::Uploaded {
                records: outcome.records,
                batches: outcome.batches,
                errors: outcome.errors,
                partial: outcome.partial,
            },
            Err(err) => FileStatus::MutationFailed(err.to_string()),
        };
        FileOutcome::new(file, status)
    }
}
