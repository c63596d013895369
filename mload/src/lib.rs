pub mod classify;
pub mod coerce;
pub mod config;
pub mod errors;
pub mod models;
pub mod mutation;
pub mod ndf;
pub mod pipeline;
pub mod reader;
pub mod reflector;
pub mod report;
pub mod schema;
pub mod upload;
pub mod utils;
pub mod value;

pub use crate::errors::{LoadError, Result};
pub use crate::pipeline::{Destination, LoadOptions, Loader};
pub use crate::report::LoadReport;
pub use crate::schema::Schema;

use std::path::Path;

/// Loads `path` (a CSV/JSON file or a directory of them) against `schema`.
///
/// Records are reconciled with the schema's types and fields, coerced to
/// their GraphQL scalar types and then either:
/// - sent to a live endpoint as batched mutations (`Destination::Endpoint`), or
/// - written as NDF `nodes/`, `lists/` and `relations/` files
///   (`Destination::Ndf`).
///
/// # Example
///
/// ```rust,no_run
/// use mload::{Destination, LoadOptions, Schema};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> mload::Result<()> {
///     let schema = Schema::load(Path::new("schema.graphql")).await?;
///     let report = mload::load(
///         &schema,
///         Destination::Ndf("out".into()),
///         LoadOptions::default(),
///         Path::new("data"),
///     )
///     .await?;
///     println!("{report}");
///     Ok(())
/// }
/// ```
pub async fn load(
    schema: &Schema,
    destination: Destination<'_>,
    options: LoadOptions,
    path: &Path,
) -> Result<LoadReport> {
    Loader::new(schema, destination, options).run(path).await
}
