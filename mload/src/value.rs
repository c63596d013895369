use serde_json::{Map, Number, Value};

/// A coerced scalar, tagged with the GraphQL scalar family it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Int(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    /// ISO-8601 date or date-time text.
    Date(String),
    /// Time of day, exactly as it appeared in the input.
    Time(String),
    Enum(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Scalar::Boolean(b) => Value::Bool(*b),
            Scalar::String(s) | Scalar::Date(s) | Scalar::Time(s) | Scalar::Enum(s) => {
                Value::String(s.clone())
            }
        }
    }

    /// Renders the value as a GraphQL input literal. Strings are JSON-quoted,
    /// enum values stay bare.
    pub fn to_graphql(&self) -> String {
        match self {
            Scalar::Enum(name) => name.clone(),
            other => other.to_json().to_string(),
        }
    }
}

/// A classified record field, shared by the NDF converter and the mutation
/// builder.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
    /// Edges to one or more entities of `to_type`, by normalized id.
    Relation { to_type: String, ids: Vec<String> },
    /// A nested input object.
    Object(Vec<(String, FieldValue)>),
    ObjectList(Vec<Vec<(String, FieldValue)>>),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Scalar(scalar) => scalar.to_json(),
            FieldValue::List(items) => Value::Array(items.iter().map(Scalar::to_json).collect()),
            FieldValue::Relation { ids, .. } => {
                Value::Array(ids.iter().cloned().map(Value::String).collect())
            }
            FieldValue::Object(fields) => object_to_json(fields),
            FieldValue::ObjectList(objects) => {
                Value::Array(objects.iter().map(|fields| object_to_json(fields)).collect())
            }
        }
    }

    pub fn to_graphql(&self) -> String {
        match self {
            FieldValue::Scalar(scalar) => scalar.to_graphql(),
            FieldValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(Scalar::to_graphql).collect();
                format!("[{}]", rendered.join(", "))
            }
            FieldValue::Relation { ids, .. } => {
                let rendered: Vec<String> = ids
                    .iter()
                    .map(|id| Value::String(id.clone()).to_string())
                    .collect();
                if rendered.len() == 1 {
                    rendered[0].clone()
                } else {
                    format!("[{}]", rendered.join(", "))
                }
            }
            FieldValue::Object(fields) => object_to_graphql(fields),
            FieldValue::ObjectList(objects) => {
                let rendered: Vec<String> =
                    objects.iter().map(|fields| object_to_graphql(fields)).collect();
                format!("[{}]", rendered.join(", "))
            }
        }
    }
}

fn object_to_json(fields: &[(String, FieldValue)]) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();
    Value::Object(map)
}

/// Renders `{a: 1, b: "x"}`.
pub fn object_to_graphql(fields: &[(String, FieldValue)]) -> String {
    let rendered: Vec<String> = fields
        .iter()
        .map(|(name, value)| format!("{name}: {}", value.to_graphql()))
        .collect();
    format!("{{{}}}", rendered.join(", "))
}

/// Short description of a raw JSON value's shape, for error messages.
pub fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
