use thiserror::Error;

/// Failures resolving types, fields and mutations against the schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("failed to parse schema: {0}")]
    Parse(String),

    #[error("type '{0}' is not defined in the schema")]
    TypeNotFound(String),

    #[error("field '{field}' is not defined on type '{type_name}'")]
    UndefinedField { type_name: String, field: String },

    #[error("mutation '{0}' is not defined in the schema")]
    MutationNotFound(String),

    #[error("mutation '{0}' must take exactly one argument named 'input'")]
    InputArgumentMissing(String),
}

/// Failures turning an input file into records.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("failed to parse {path}: {message}")]
    ParseFailed {
        path: String,
        line: Option<u64>,
        message: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("{path}: element {index} is {found}, expected an object")]
    NotAnObject {
        path: String,
        index: usize,
        found: &'static str,
    },
}

/// Hard coercion failures. Unparsable numbers are not errors: they fall back
/// to the default value with a warning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("'{value}' is not a valid {type_name}")]
    InvalidDate { type_name: String, value: String },

    #[error("'{0}' is not a valid time of day")]
    InvalidTime(String),
}

/// Problems confined to a single record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("record has no id")]
    MissingId,

    /// `existing` is the raw id that first claimed `normalized`; it differs
    /// from `raw` when another raw id normalizes to the same value.
    #[error("duplicate id '{raw}'{}", collision_note(.raw, .normalized, .existing))]
    DuplicateId {
        raw: String,
        normalized: String,
        existing: String,
    },

    #[error("field '{field}' holds '{value}', which is not a value of enum {enum_type}")]
    InvalidEnum {
        field: String,
        enum_type: String,
        value: String,
    },

    #[error("field '{field}' expects {expected} but the record holds {found}")]
    ShapeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("field '{field}': {source}")]
    Coercion {
        field: String,
        #[source]
        source: CoercionError,
    },
}

fn collision_note(raw: &str, normalized: &str, existing: &str) -> String {
    if raw == existing {
        String::new()
    } else {
        format!(" (normalizes to '{normalized}', already taken by '{existing}')")
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("endpoint '{0}' is not declared in the configuration")]
    EndpointNotFound(String),

    #[error("no endpoint configured; pass --endpoint-url or declare one in .graphqlconfig")]
    NoEndpoint,

    #[error("invalid endpoint url '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("unknown list rule '{0}', expected wrapped, suffix or either")]
    UnknownListRule(String),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("GraphQL transport error: {0}")]
    Transport(#[from] gqlfetcher::GraphQLClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LoadError>;
